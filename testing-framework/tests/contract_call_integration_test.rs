// Integration tests for deferred contract-call verification
// Calls go to the embedded vault; outcomes only exist after production

use nom_testing_framework::prelude::*;

fn harness() -> TestHarness {
    let _ = env_logger::builder().is_test(true).try_init();
    TestHarnessBuilder::new().build().unwrap()
}

fn vault_call(method: VaultMethod, amount: u64) -> AccountBlock {
    AccountBlock {
        address: USER_KEYS[0].address(),
        to_address: VAULT_ADDRESS,
        amount,
        data: method.to_data(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_successful_deposit() {
    let harness = harness();
    let alice = USER_KEYS[0].address();

    let call = harness.call_contract(vault_call(VaultMethod::Deposit, 100));
    assert!(matches!(call.resolve(), Err(CallError::NotYetResolved(_))));

    harness.advance_one().await;
    assert_eq!(call.resolve(), Ok(()));
    call.expect(harness.reporter(), None);

    harness.expect_balance(alice, ZNN_TOKEN_STANDARD, GENESIS_ZNN_BALANCE - 100);
    harness.expect_balance(VAULT_ADDRESS, ZNN_TOKEN_STANDARD, 100);
    assert_eq!(Vault::deposit_of(harness.chain().as_ref(), &alice).unwrap(), 100);
    assert!(harness.failures().is_empty());
}

#[tokio::test]
async fn test_rejected_withdraw_reports_exact_error() {
    let harness = harness();

    let call = harness.call_contract(vault_call(VaultMethod::Withdraw { amount: 50 }, 0));
    harness.advance_one().await;

    assert_eq!(
        call.resolve(),
        Err(CallError::Failed(
            "insufficient deposit: requested 50, available 0".to_string()
        ))
    );
    call.expect(
        harness.reporter(),
        Some("insufficient deposit: requested 50, available 0"),
    );
    assert!(harness.failures().is_empty());
}

#[tokio::test]
async fn test_outcome_recorded_only_after_production() {
    let harness = harness();
    let diagnostics = harness.diagnostics();

    let call = harness.call_contract(vault_call(VaultMethod::Deposit, 1));
    assert!(diagnostics.is_empty());

    let momentum = harness.advance_one().await.momentum().cloned().unwrap();
    assert!(momentum.content.contains(&call.send_block()));
    assert_eq!(diagnostics.len(), 1);

    let record = diagnostics.record(&call.send_block().hash).unwrap();
    assert!(record.is_success());
    assert_eq!(record.identifier.address, VAULT_ADDRESS);
    assert!(momentum.content.contains(&record.identifier));

    // Later momentums do not execute the call again
    harness.advance_one().await;
    assert_eq!(diagnostics.len(), 1);
}

#[tokio::test]
async fn test_failed_call_refunds_caller() {
    let harness = harness();
    let alice = USER_KEYS[0].address();

    let call = harness.call_contract(vault_call(VaultMethod::Withdraw { amount: 5 }, 25));
    harness.advance_one().await;
    call.expect(harness.reporter(), Some("withdraw does not accept funds"));
    harness.expect_balance(alice, ZNN_TOKEN_STANDARD, GENESIS_ZNN_BALANCE - 25);

    let refund = harness
        .account_context(VAULT_ADDRESS)
        .frontier()
        .unwrap();
    assert_eq!(refund.block_type, BlockType::ContractSend);
    assert_eq!(refund.to_address, alice);
    assert_eq!(refund.amount, 25);

    let expected_diff = format!(
        "\nstorage\nbalance\n{} {}",
        ZNN_TOKEN_STANDARD, GENESIS_ZNN_BALANCE
    );
    harness
        .submit_receive(&refund.header(), AccountBlock::default(), None, &expected_diff)
        .unwrap();
    harness.expect_balance(alice, ZNN_TOKEN_STANDARD, GENESIS_ZNN_BALANCE);
    harness.expect_balance(VAULT_ADDRESS, ZNN_TOKEN_STANDARD, 0);
    assert!(harness.failures().is_empty());
}

#[tokio::test]
async fn test_withdraw_after_deposit() {
    let harness = harness();
    let alice = USER_KEYS[0].address();

    let deposit = harness.call_contract(vault_call(VaultMethod::Deposit, 100));
    harness.advance_one().await;
    deposit.expect(harness.reporter(), None);

    let withdraw = harness.call_contract(vault_call(VaultMethod::Withdraw { amount: 40 }, 0));
    harness.advance_one().await;
    withdraw.expect(harness.reporter(), None);
    assert_eq!(Vault::deposit_of(harness.chain().as_ref(), &alice).unwrap(), 60);

    let payout = harness.account_context(VAULT_ADDRESS).frontier().unwrap();
    assert_eq!(payout.amount, 40);
    harness.submit_receive(&payout.header(), AccountBlock::default(), None, SKIP_VM_CHANGES);
    harness.expect_balance(alice, ZNN_TOKEN_STANDARD, GENESIS_ZNN_BALANCE - 60);
    assert!(harness.failures().is_empty());
}

#[tokio::test]
async fn test_expectation_mismatch_is_recorded() {
    let harness = harness();

    let call = harness.call_contract(vault_call(VaultMethod::Deposit, 10));
    call.expect(harness.reporter(), None);
    harness.advance_one().await;
    call.expect(harness.reporter(), Some("boom"));

    let failures = harness.take_failures();
    assert_eq!(failures.len(), 2);
    assert!(failures[0].contains("can't find the outcome of send-block"));
    assert!(failures[1].contains("expected: boom"));
}

#[tokio::test]
#[should_panic(expected = "requires an embedded contract address")]
async fn test_call_to_user_address_is_fatal() {
    let harness = harness();
    harness.call_contract(AccountBlock {
        address: USER_KEYS[0].address(),
        to_address: USER_KEYS[1].address(),
        ..Default::default()
    });
}
