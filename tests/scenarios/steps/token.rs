use cucumber::{given, then, when};
use ledger_scenarios::{
    client::{Client, ClientError, TokenInfoQuery},
    fixture::Party,
    hbar::Hbar,
    id::TokenId,
    key::PrivateKey,
    receipt::{Status, TransactionReceipt},
    token::{TokenInfo, TokenSupplyType},
    transaction::{
        AccountCreateTransaction, TokenAssociateTransaction, TokenCreateTransaction,
        TokenMintTransaction, TransferTransaction,
    },
};
use tracing::info;

use super::{HTT_DECIMALS, balance, configured_account, htt, ordinal};
use crate::LedgerWorld;

const RECIPIENT_PAYS: &str = "Create a token transfer transaction paid for by the recipient";
const TWO_ACCOUNT_TRANSFER: &str = "Transfer tokens between 2 accounts";

async fn token_info(world: &LedgerWorld) -> TokenInfo {
    TokenInfoQuery::new()
        .token_id(world.token_id())
        .execute(&world.client)
        .await
        .expect("token info query succeeds")
}

async fn mint(
    client: &Client,
    token_id: TokenId,
    amount: u64,
) -> Result<TransactionReceipt, ClientError> {
    TokenMintTransaction::new()
        .token_id(token_id)
        .amount(amount)
        .execute(client)
        .await?
        .get_receipt(client)
        .await
}

fn test_token() -> TokenCreateTransaction {
    TokenCreateTransaction::new()
        .name("Test Token")
        .symbol("HTT")
        .decimals(HTT_DECIMALS)
}

#[given(regex = r"^A Hedera account with more than (\d+) hbar$")]
async fn hedera_account(world: &mut LedgerWorld, more_than: i64) {
    configured_account(world, 0, Some(more_than)).await;
}

#[when(regex = r"^I create a token named Test Token \(HTT\)$")]
async fn create_mintable_token(world: &mut LedgerWorld) {
    let account = world.party(0).clone();
    let client = &world.client;
    let receipt = test_token()
        .admin_key(account.private_key.public_key())
        .supply_key(account.private_key.public_key())
        .treasury_account_id(account.account_id)
        .execute(client)
        .await
        .expect("token create is accepted")
        .get_receipt(client)
        .await
        .expect("token is created");
    world.token_id = receipt.token_id;
}

#[when(regex = r"^I create a fixed supply token named Test Token \(HTT\) with (\d+) tokens$")]
async fn create_fixed_supply_token(world: &mut LedgerWorld, supply: u64) {
    let account = world.party(0).clone();
    let client = &world.client;
    let receipt = test_token()
        .initial_supply(htt(supply))
        .supply_type(TokenSupplyType::Finite)
        .max_supply(htt(supply))
        .admin_key(account.private_key.public_key())
        .treasury_account_id(account.account_id)
        .execute(client)
        .await
        .expect("token create is accepted")
        .get_receipt(client)
        .await
        .expect("token is created");
    world.token_id = receipt.token_id;
}

#[then(regex = r#"^The token has the name "([^"]*)"$"#)]
async fn token_name(world: &mut LedgerWorld, name: String) {
    assert_eq!(token_info(world).await.name, name);
}

#[then(regex = r#"^The token has the symbol "([^"]*)"$"#)]
async fn token_symbol(world: &mut LedgerWorld, symbol: String) {
    assert_eq!(token_info(world).await.symbol, symbol);
}

#[then(regex = r"^The token has (\d+) decimals$")]
async fn token_decimals(world: &mut LedgerWorld, decimals: u32) {
    assert_eq!(token_info(world).await.decimals, decimals);
}

#[then(regex = r"^The token is owned by the account$")]
async fn token_owner(world: &mut LedgerWorld) {
    let info = token_info(world).await;
    assert_eq!(info.treasury_account_id, world.party(0).account_id);
}

#[then(regex = r"^An attempt to mint (\d+) additional tokens succeeds$")]
async fn mint_succeeds(world: &mut LedgerWorld, amount: u64) {
    let before = token_info(world).await.total_supply;
    let receipt = mint(&world.client, world.token_id(), amount)
        .await
        .expect("mint succeeds");
    assert_eq!(receipt.total_supply, Some(before + amount));
}

#[then(regex = r"^The total supply of the token is (\d+)$")]
async fn total_supply(world: &mut LedgerWorld, supply: u64) {
    assert_eq!(token_info(world).await.total_supply, htt(supply));
}

#[then(regex = r"^An attempt to mint tokens fails$")]
async fn mint_fails(world: &mut LedgerWorld) {
    match mint(&world.client, world.token_id(), 1_000).await {
        Ok(receipt) => panic!("minting a fixed supply token succeeded: {receipt:?}"),
        Err(err) => {
            info!(%err, "minting failed as expected for fixed supply token");
            assert_eq!(err.status(), Some(Status::TokenHasNoSupplyKey));
        }
    }
}

#[given(regex = r"^A first hedera account with more than (\d+) hbar$")]
async fn first_hedera_account(world: &mut LedgerWorld, more_than: i64) {
    configured_account(world, 0, Some(more_than)).await;
}

#[given(regex = r"^A second Hedera account$")]
async fn second_hedera_account(world: &mut LedgerWorld) {
    configured_account(world, 1, None).await;
}

/// The scenario decides which account acts as treasury and how much is
/// minted up front. The supply is always capped at `supply` tokens.
#[given(regex = r"^A token named Test Token \(HTT\) with (\d+) tokens$")]
async fn token_with_supply(world: &mut LedgerWorld, supply: u64) {
    let (treasury, initial_supply) = if world.scenario.contains(RECIPIENT_PAYS) {
        (world.party(1).clone(), htt(100))
    } else if world.scenario.contains(TWO_ACCOUNT_TRANSFER) {
        (world.party(0).clone(), htt(100))
    } else {
        (world.treasury.clone(), htt(supply))
    };

    let client = &world.client;
    let receipt = test_token()
        .initial_supply(initial_supply)
        .supply_type(TokenSupplyType::Finite)
        .max_supply(htt(supply))
        .treasury_account_id(treasury.account_id)
        .freeze_with(client)
        .expect("token create freezes")
        .sign(&treasury.private_key)
        .execute(client)
        .await
        .expect("token create is accepted")
        .get_receipt(client)
        .await
        .expect("token is created");
    world.token_id = receipt.token_id;
}

async fn assert_holds(world: &LedgerWorld, which: &str, tokens: u64) {
    let account_id = world.party(ordinal(which)).account_id;
    let balance = balance(world, account_id).await;
    assert_eq!(
        balance.token_balance(&world.token_id()),
        htt(tokens),
        "{which} account {account_id}"
    );
}

#[given(regex = r"^The (first|second|third|fourth) account holds (\d+) HTT tokens$")]
async fn account_starts_with(world: &mut LedgerWorld, which: String, tokens: u64) {
    assert_holds(world, &which, tokens).await;
}

#[then(regex = r"^The (first|second|third|fourth) account holds (\d+) HTT tokens$")]
async fn account_ends_with(world: &mut LedgerWorld, which: String, tokens: u64) {
    assert_holds(world, &which, tokens).await;
}

async fn associate(world: &LedgerWorld, party: &Party) {
    let client = &world.client;
    TokenAssociateTransaction::new()
        .account_id(party.account_id)
        .token_ids([world.token_id()])
        .freeze_with(client)
        .expect("association freezes")
        .sign(&party.private_key)
        .execute(client)
        .await
        .expect("association is accepted")
        .get_receipt(client)
        .await
        .expect("account is associated with the token");
}

/// Associates the receiver, then leaves a transfer signed by the sender pending.
async fn prepare_transfer(world: &mut LedgerWorld, from: usize, to: usize, tokens: u64) {
    let sender = world.party(from).clone();
    let receiver = world.party(to).clone();
    associate(world, &receiver).await;

    let token_id = world.token_id();
    let amount = htt(tokens) as i64;
    let transfer = TransferTransaction::new()
        .token_transfer(token_id, sender.account_id, -amount)
        .token_transfer(token_id, receiver.account_id, amount)
        .freeze_with(&world.client)
        .expect("transfer freezes")
        .sign(&sender.private_key);
    world.pending_transfer = Some(transfer);
}

#[when(regex = r"^The first account creates a transaction to transfer (\d+) HTT tokens to the second account$")]
async fn first_transfers_to_second(world: &mut LedgerWorld, tokens: u64) {
    prepare_transfer(world, 0, 1, tokens).await;
}

#[when(regex = r"^The second account creates a transaction to transfer (\d+) HTT tokens to the first account$")]
async fn second_transfers_to_first(world: &mut LedgerWorld, tokens: u64) {
    prepare_transfer(world, 1, 0, tokens).await;
}

#[when(regex = r"^The first account submits the transaction$")]
async fn submit_transfer(world: &mut LedgerWorld) {
    let transfer = world
        .pending_transfer
        .take()
        .expect("no transaction is pending");
    let client = &world.client;
    let response = transfer
        .execute(client)
        .await
        .expect("transfer is accepted");
    response
        .get_receipt(client)
        .await
        .expect("transfer succeeds");
    world.submitted = Some(response);
}

#[then(regex = r"^The first account has paid for the transaction fee$")]
async fn first_account_paid(world: &mut LedgerWorld) {
    let response = world.submitted.expect("no transaction was submitted");
    let record = response
        .get_record(&world.client)
        .await
        .expect("record is available");
    assert_eq!(record.transaction_id.account_id, world.party(0).account_id);
    assert!(record.transaction_fee > Hbar::ZERO);
}

/// Creates an account funded by the operator, associates it with the token
/// and moves `tokens` HTT into it from the treasury.
async fn funded_account(world: &LedgerWorld, hbars: Hbar, tokens: u64) -> Party {
    let client = &world.client;
    let private_key = PrivateKey::generate_ed25519();
    let receipt = AccountCreateTransaction::new()
        .key(private_key.public_key())
        .initial_balance(hbars)
        .execute(client)
        .await
        .expect("account create is accepted")
        .get_receipt(client)
        .await
        .expect("account is created");
    let party = Party {
        account_id: receipt.account_id.expect("receipt carries the account id"),
        private_key,
    };
    associate(world, &party).await;

    let token_id = world.token_id();
    let treasury = &world.treasury;
    let amount = htt(tokens) as i64;
    TransferTransaction::new()
        .token_transfer(token_id, treasury.account_id, -amount)
        .token_transfer(token_id, party.account_id, amount)
        .freeze_with(client)
        .expect("transfer freezes")
        .sign(&treasury.private_key)
        .execute(client)
        .await
        .expect("transfer is accepted")
        .get_receipt(client)
        .await
        .expect("treasury funds the account");
    party
}

#[given(regex = r"^A first hedera account with more than (\d+) hbar and (\d+) HTT tokens$")]
async fn first_funded_account(world: &mut LedgerWorld, more_than: i64, tokens: u64) {
    let party = funded_account(world, Hbar::new(more_than + 2), tokens).await;
    let balance = balance(world, party.account_id).await;
    assert!(balance.hbars > Hbar::new(more_than));
    assert_eq!(balance.token_balance(&world.token_id()), htt(tokens));
    world.parties[0] = Some(party);
}

#[given(regex = r"^A (second|third|fourth) Hedera account with (\d+) hbar and (\d+) HTT tokens$")]
async fn other_funded_account(world: &mut LedgerWorld, which: String, hbars: i64, tokens: u64) {
    let party = funded_account(world, Hbar::new(hbars), tokens).await;
    let balance = balance(world, party.account_id).await;
    assert_eq!(balance.hbars, Hbar::new(hbars));
    assert_eq!(balance.token_balance(&world.token_id()), htt(tokens));
    world.parties[ordinal(&which)] = Some(party);
}

#[when(regex = r"^A transaction is created to transfer (\d+) HTT tokens out of the first and second account and (\d+) HTT tokens into the third account and (\d+) HTT tokens into the fourth account$")]
async fn multi_party_transfer(world: &mut LedgerWorld, out: u64, into_third: u64, into_fourth: u64) {
    let token_id = world.token_id();
    let [first, second, third, fourth] = [0, 1, 2, 3].map(|index| world.party(index).clone());
    let transfer = TransferTransaction::new()
        .token_transfer(token_id, first.account_id, -(htt(out) as i64))
        .token_transfer(token_id, second.account_id, -(htt(out) as i64))
        .token_transfer(token_id, third.account_id, htt(into_third) as i64)
        .token_transfer(token_id, fourth.account_id, htt(into_fourth) as i64)
        .freeze_with(&world.client)
        .expect("transfer freezes")
        .sign(&first.private_key)
        .sign(&second.private_key);
    world.pending_transfer = Some(transfer);
}
