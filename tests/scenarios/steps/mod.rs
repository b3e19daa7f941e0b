use ledger_scenarios::{
    account::AccountBalance, client::AccountBalanceQuery, hbar::Hbar, id::AccountId,
};

use crate::LedgerWorld;

mod token;
mod topic;

pub const ORDINALS: [&str; 4] = ["first", "second", "third", "fourth"];

/// HTT is created with 2 decimals.
pub const HTT_DECIMALS: u32 = 2;

/// Smallest HTT units in `whole` tokens.
pub fn htt(whole: u64) -> u64 {
    whole * 10u64.pow(HTT_DECIMALS)
}

pub fn ordinal(name: &str) -> usize {
    ORDINALS
        .iter()
        .position(|ordinal| *ordinal == name)
        .unwrap_or_else(|| panic!("unknown account ordinal `{name}`"))
}

pub async fn balance(world: &LedgerWorld, account_id: AccountId) -> AccountBalance {
    AccountBalanceQuery::new()
        .account_id(account_id)
        .execute(&world.client)
        .await
        .expect("balance query succeeds")
}

/// Makes configured account `index` the scenario's account at the same
/// position, operated by the client when it is the first one.
pub async fn configured_account(world: &mut LedgerWorld, index: usize, more_than: Option<i64>) {
    let party = world
        .ledger
        .party(index)
        .expect("account is configured")
        .clone();
    if index == 0 {
        world.operate_as(&party);
    }
    if let Some(more_than) = more_than {
        let balance = balance(world, party.account_id).await;
        assert!(
            balance.hbars > Hbar::new(more_than),
            "{} holds {}, expected more than {more_than} hbar",
            party.account_id,
            balance.hbars,
        );
    }
    world.parties[index] = Some(party);
}
