use cucumber::{given, then, when};
use ledger_scenarios::{
    client::TopicInfoQuery,
    key::{Key, KeyList},
    transaction::{TopicCreateTransaction, TopicMessageSubmitTransaction},
};

use super::configured_account;
use crate::LedgerWorld;

#[given(regex = r"^a first account with more than (\d+) hbars$")]
async fn first_account(world: &mut LedgerWorld, more_than: i64) {
    configured_account(world, 0, Some(more_than)).await;
}

#[given(regex = r"^A second account with more than (\d+) hbars$")]
async fn second_account(world: &mut LedgerWorld, more_than: i64) {
    configured_account(world, 1, Some(more_than)).await;
}

#[given(regex = r"^A (\d+) of (\d+) threshold key with the first and second account$")]
async fn threshold_key(world: &mut LedgerWorld, threshold: u32, total: usize) {
    let keys = [
        world.party(0).private_key.public_key(),
        world.party(1).private_key.public_key(),
    ];
    assert_eq!(keys.len(), total);
    let key_list = KeyList::with_threshold(keys, threshold);
    assert_eq!(key_list.threshold(), Some(threshold));
    world.threshold_key = Some(key_list);
}

#[when(regex = r#"^A topic is created with the memo "([^"]*)" with the first account as the submit key$"#)]
async fn topic_with_account_key(world: &mut LedgerWorld, memo: String) {
    let submit_key = Key::from(&world.party(0).private_key);
    create_topic(world, memo, submit_key).await;
}

#[when(regex = r#"^A topic is created with the memo "([^"]*)" with the threshold key as the submit key$"#)]
async fn topic_with_threshold_key(world: &mut LedgerWorld, memo: String) {
    let submit_key = world
        .threshold_key
        .clone()
        .expect("the threshold key is not set");
    create_topic(world, memo, submit_key.into()).await;
}

async fn create_topic(world: &mut LedgerWorld, memo: String, submit_key: Key) {
    let client = &world.client;
    let receipt = TopicCreateTransaction::new()
        .topic_memo(memo.clone())
        .submit_key(submit_key)
        .execute(client)
        .await
        .expect("topic create is accepted")
        .get_receipt(client)
        .await
        .expect("topic is created");
    let topic_id = receipt.topic_id.expect("receipt carries the topic id");

    let info = TopicInfoQuery::new()
        .topic_id(topic_id)
        .execute(client)
        .await
        .expect("topic info query succeeds");
    assert_eq!(info.topic_memo, memo);
    world.topic_id = Some(topic_id);
}

#[when(regex = r#"^The message "([^"]*)" is published to the topic$"#)]
async fn publish(world: &mut LedgerWorld, message: String) {
    let client = &world.client;
    let receipt = TopicMessageSubmitTransaction::new()
        .topic_id(world.topic_id())
        .message(message)
        .execute(client)
        .await
        .expect("message submit is accepted")
        .get_receipt(client)
        .await
        .expect("message reaches consensus");
    assert!(receipt.topic_sequence_number.is_some());
}

#[then(regex = r#"^The message "([^"]*)" is received by the topic and can be printed to the console$"#)]
async fn received(world: &mut LedgerWorld, message: String) {
    let topic_id = world.topic_id();
    let settle = world.ledger.config().mirror.settle();
    let mirror = world.mirror().await;

    println!("\nWaiting for Mirror Node to update...");
    tokio::time::sleep(settle).await;

    let latest = mirror
        .latest_message(topic_id)
        .await
        .expect("mirror node answers")
        .unwrap_or_else(|| panic!("no messages found yet in the mirror node for {topic_id}"));
    println!("\nLatest message: {latest}\n");
    assert_eq!(latest, message);
}
