use super::*;
use price_sentinel::NotificationStatus;
use price_sentinel::config::{DiscordConfig, NotifyPolicyMode};
use price_sentinel::plugins::notifiers;

fn discord_config(dir: &Path, webhook_url: String) -> AppConfig {
    let mut config = get_test_config(dir);
    config.notifications.discord = Some(DiscordConfig {
        webhook_url,
        username: Some("Price Sentinel".to_string()),
    });
    config
}

#[tokio::test]
async fn test_discord_alert_for_price_drop() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, "/dp/B0TV", product_page("55\" Television", "41,990")).await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/42/token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir()?;
    let config = discord_config(dir.path(), format!("{}/api/webhooks/42/token", server.uri()));

    let notifier = notifiers::from_config(&config.notifications)?;
    assert_eq!(notifier.plugin_type(), "discord");
    let watcher = PriceWatcher::new(&config, notifier)?;

    let report = watcher.check_now(&target_at(&server, "/dp/B0TV", "45000")).await?;
    assert_eq!(report.notification, NotificationStatus::Sent);

    Ok(())
}

#[tokio::test]
async fn test_rejected_webhook_keeps_observation() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, "/dp/B0TV", product_page("55\" Television", "41,990")).await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/42/token"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir()?;
    let config = discord_config(dir.path(), format!("{}/api/webhooks/42/token", server.uri()));
    let watcher = PriceWatcher::new(&config, notifiers::from_config(&config.notifications)?)?;

    let report = watcher.check_now(&target_at(&server, "/dp/B0TV", "45000")).await?;

    assert!(matches!(report.notification, NotificationStatus::Failed { .. }));
    assert_eq!(watcher.history().await?, vec![report.observation]);

    Ok(())
}

#[tokio::test]
async fn test_no_webhook_call_above_target() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, "/dp/B0TV", product_page("55\" Television", "49,990")).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir()?;
    let config = discord_config(dir.path(), format!("{}/api/webhooks/42/token", server.uri()));
    let watcher = PriceWatcher::new(&config, notifiers::from_config(&config.notifications)?)?;

    let report = watcher.check_now(&target_at(&server, "/dp/B0TV", "45000")).await?;

    assert_eq!(report.notification, NotificationStatus::NotTriggered);
    assert_eq!(report.observation.price, Decimal::from(49990));

    Ok(())
}

#[tokio::test]
async fn test_cooldown_policy_from_config() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, "/dp/B0SALE", product_page("Blender", "1,499")).await;
    let dir = tempfile::tempdir()?;
    let mut config = get_test_config(dir.path());
    config.notifications.policy = NotifyPolicyMode::Cooldown;
    config.notifications.cooldown_secs = 3600;
    let (watcher, notifier) = create_test_watcher(&config)?;
    let target = target_at(&server, "/dp/B0SALE", "2000");

    let first = watcher.check_now(&target).await?;
    let second = watcher.check_now(&target).await?;

    assert_eq!(first.notification, NotificationStatus::Sent);
    assert_eq!(second.notification, NotificationStatus::Suppressed);
    assert_eq!(notifier.events().len(), 1);
    assert_eq!(watcher.history().await?.len(), 2);

    Ok(())
}
