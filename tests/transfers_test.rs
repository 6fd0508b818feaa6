mod common;

use anyhow::Result;
use common::{test_service, total_balance, StandardAccounts};
use rust_decimal_macros::dec;
use saldo::application::AppError;
use uuid::Uuid;

#[tokio::test]
async fn test_transfer_moves_value_and_records_transaction() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;

    let receipt = service
        .transfer(
            accounts.alice,
            accounts.bob,
            dec!(30.00),
            Some("rent".into()),
        )
        .await?;

    assert_eq!(receipt.sender_balance, dec!(70.00));
    assert_eq!(receipt.receiver_balance, dec!(80.00));
    assert_eq!(service.get_balance(accounts.alice).await?, dec!(70.00));
    assert_eq!(service.get_balance(accounts.bob).await?, dec!(80.00));

    let recorded = service.get_transaction(receipt.transaction.id).await?;
    assert_eq!(recorded.sender, accounts.alice);
    assert_eq!(recorded.receiver, accounts.bob);
    assert_eq!(recorded.amount, dec!(30.00));
    assert_eq!(recorded.details, Some("rent".to_string()));

    Ok(())
}

#[tokio::test]
async fn test_transfer_conserves_total_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;

    let before = total_balance(&service).await?;
    service
        .transfer(accounts.alice, accounts.bob, dec!(12.34), None)
        .await?;
    service
        .transfer(accounts.bob, accounts.carol, dec!(0.01), None)
        .await?;
    let after = total_balance(&service).await?;

    assert_eq!(before, after);
    Ok(())
}

#[tokio::test]
async fn test_insufficient_balance_leaves_no_trace() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;

    let result = service
        .transfer(accounts.alice, accounts.bob, dec!(100.01), None)
        .await;

    assert!(matches!(
        result,
        Err(AppError::InsufficientBalance { balance, required, .. })
            if balance == dec!(100.00) && required == dec!(100.01)
    ));
    assert_eq!(service.get_balance(accounts.alice).await?, dec!(100.00));
    assert_eq!(service.get_balance(accounts.bob).await?, dec!(50.00));
    assert!(service.list_transactions().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_transfer_of_exact_balance_succeeds() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;

    service
        .transfer(accounts.alice, accounts.bob, dec!(100.00), None)
        .await?;

    assert_eq!(service.get_balance(accounts.alice).await?, dec!(0.00));
    assert_eq!(service.get_balance(accounts.bob).await?, dec!(150.00));
    Ok(())
}

#[tokio::test]
async fn test_self_transfer_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;

    let result = service
        .transfer(accounts.alice, accounts.alice, dec!(1.00), None)
        .await;

    assert!(matches!(result, Err(AppError::SelfTransfer)));
    Ok(())
}

#[tokio::test]
async fn test_non_positive_amount_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;

    for amount in [dec!(0), dec!(-5.00)] {
        let result = service
            .transfer(accounts.alice, accounts.bob, amount, None)
            .await;
        assert!(matches!(result, Err(AppError::InvalidAmount(_))));
    }

    // Sub-cent precision is not representable in the persisted schema
    let result = service
        .transfer(accounts.alice, accounts.bob, dec!(0.001), None)
        .await;
    assert!(matches!(result, Err(AppError::InvalidAmount(_))));

    assert!(service.list_transactions().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unknown_account_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;
    let ghost = Uuid::new_v4();

    let result = service.transfer(ghost, accounts.bob, dec!(1.00), None).await;
    assert!(matches!(result, Err(AppError::AccountNotFound(_))));

    let result = service
        .transfer(accounts.alice, ghost, dec!(1.00), None)
        .await;
    assert!(matches!(result, Err(AppError::AccountNotFound(_))));

    assert_eq!(service.get_balance(accounts.alice).await?, dec!(100.00));
    Ok(())
}

#[tokio::test]
async fn test_transactions_listed_in_insertion_order() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;

    let first = service
        .transfer(accounts.alice, accounts.bob, dec!(1.00), None)
        .await?;
    let second = service
        .transfer(accounts.alice, accounts.carol, dec!(2.00), None)
        .await?;
    let third = service
        .transfer(accounts.bob, accounts.carol, dec!(3.00), None)
        .await?;

    let listed = service.list_transactions().await?;
    let ids: Vec<_> = listed.iter().map(|t| t.id).collect();
    assert_eq!(
        ids,
        vec![
            first.transaction.id,
            second.transaction.id,
            third.transaction.id
        ]
    );
    assert!(listed.windows(2).all(|w| w[0].sequence < w[1].sequence));

    Ok(())
}

#[tokio::test]
async fn test_decimal_arithmetic_stays_exact() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let accounts = StandardAccounts::create(&service).await?;

    // 0.10 has no exact binary representation; ten hops must still land
    // on an exact total.
    for _ in 0..10 {
        service
            .transfer(accounts.alice, accounts.bob, dec!(0.10), None)
            .await?;
    }

    assert_eq!(service.get_balance(accounts.alice).await?, dec!(99.00));
    assert_eq!(service.get_balance(accounts.bob).await?, dec!(51.00));
    Ok(())
}
