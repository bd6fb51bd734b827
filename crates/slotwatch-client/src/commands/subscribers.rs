//! Subscriber administration.

use slotwatch_server::SubscriberStore;

use crate::config::ClientConfig;
use crate::error::ClientResult;

fn store(config: &ClientConfig) -> SubscriberStore {
    SubscriberStore::new(config.storage.subscribers_path())
}

/// Print every subscriber with its subscription time.
pub async fn list(config: &ClientConfig) -> ClientResult<()> {
    let subscribers = store(config).list().await?;
    if subscribers.is_empty() {
        println!("No subscribers.");
        return Ok(());
    }
    for subscriber in subscribers {
        println!(
            "{}\tsince {}",
            subscriber.id,
            subscriber.subscribed_at.format("%Y-%m-%d %H:%M UTC")
        );
    }
    Ok(())
}

/// Subscribe a chat.
pub async fn add(config: &ClientConfig, chat_id: i64) -> ClientResult<()> {
    if store(config).add(chat_id).await? {
        println!("Subscribed {}.", chat_id);
    } else {
        println!("{} is already subscribed.", chat_id);
    }
    Ok(())
}

/// Unsubscribe a chat.
pub async fn remove(config: &ClientConfig, chat_id: i64) -> ClientResult<()> {
    if store(config).remove(chat_id).await? {
        println!("Unsubscribed {}.", chat_id);
    } else {
        println!("{} was not subscribed.", chat_id);
    }
    Ok(())
}
