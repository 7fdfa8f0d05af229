use super::*;
use price_sentinel::{AppError, NotificationStatus};
use wiremock::matchers::header;

#[tokio::test]
async fn test_fixture_page_end_to_end() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, "/dp/B0KETTLE", product_page("Acme Electric Kettle 1.5L", "₹999.50")).await;
    let dir = tempfile::tempdir()?;
    let (watcher, notifier) = create_test_watcher(&get_test_config(dir.path()))?;
    let target = target_at(&server, "/dp/B0KETTLE", "1000");

    let report = watcher.check_now(&target).await?;

    assert_eq!(report.title, "Acme Electric Kettle 1.5L");
    assert_eq!(report.observation.price, Decimal::from(999));
    assert_eq!(report.notification, NotificationStatus::Sent);

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Acme Electric Kettle 1.5L");
    assert_eq!(events[0].price, Decimal::from(999));
    assert_eq!(events[0].target_url, target.source_url);

    let history = watcher.history().await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].price, Decimal::from(999));

    Ok(())
}

#[tokio::test]
async fn test_threshold_is_inclusive() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, "/below", product_page("Lamp", "499")).await;
    mount_page(&server, "/equal", product_page("Lamp", "500")).await;
    mount_page(&server, "/above", product_page("Lamp", "501")).await;

    for (route, expected) in [("/below", Some(499)), ("/equal", Some(500)), ("/above", None)] {
        let dir = tempfile::tempdir()?;
        let (watcher, notifier) = create_test_watcher(&get_test_config(dir.path()))?;

        watcher.check_now(&target_at(&server, route, "500.00")).await?;

        let prices: Vec<Decimal> = notifier.events().iter().map(|e| e.price).collect();
        assert_eq!(prices, expected.map(Decimal::from).into_iter().collect::<Vec<_>>(), "route {}", route);
    }

    Ok(())
}

#[tokio::test]
async fn test_http_error_leaves_no_trace() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir()?;
    let (watcher, notifier) = create_test_watcher(&get_test_config(dir.path()))?;

    let result = watcher.check_now(&target_at(&server, "/dp/B0GONE", "1000")).await;

    assert!(matches!(result, Err(AppError::Network(_))));
    assert!(watcher.history().await?.is_empty());
    assert!(notifier.events().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_page_without_price() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let body = r#"<html><body><span id="productTitle">Currently unavailable</span></body></html>"#;
    mount_page(&server, "/dp/B0OOS", body.to_string()).await;
    let dir = tempfile::tempdir()?;
    let (watcher, notifier) = create_test_watcher(&get_test_config(dir.path()))?;

    let result = watcher.check_now(&target_at(&server, "/dp/B0OOS", "1000")).await;

    assert!(matches!(result, Err(AppError::PriceNotFound { .. })));
    assert!(watcher.history().await?.is_empty());
    assert!(notifier.events().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_unparsable_price() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, "/dp/B0ODD", product_page("Mystery Box", "See options")).await;
    let dir = tempfile::tempdir()?;
    let (watcher, notifier) = create_test_watcher(&get_test_config(dir.path()))?;

    let result = watcher.check_now(&target_at(&server, "/dp/B0ODD", "1000")).await;

    assert!(matches!(result, Err(AppError::PriceFormat { .. })));
    assert!(watcher.history().await?.is_empty());
    assert!(notifier.events().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_requests_carry_user_agent() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dp/B0UA"))
        .and(header("user-agent", TEST_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("Cable", "199")))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir()?;
    let (watcher, _notifier) = create_test_watcher(&get_test_config(dir.path()))?;

    watcher.check_now(&target_at(&server, "/dp/B0UA", "100")).await?;

    Ok(())
}

#[tokio::test]
async fn test_concurrent_manual_checks_are_all_recorded() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, "/dp/B0BUSY", product_page("Headphones", "2,499")).await;
    let dir = tempfile::tempdir()?;
    let (watcher, _notifier) = create_test_watcher(&get_test_config(dir.path()))?;
    let target = target_at(&server, "/dp/B0BUSY", "2000");

    let checks = (0..5).map(|_| watcher.check_now(&target));
    let reports = futures::future::try_join_all(checks).await?;

    let history = watcher.history().await?;
    assert_eq!(history.len(), 5);
    for report in &reports {
        assert!(history.contains(&report.observation));
    }
    assert!(history.iter().all(|o| o.price == Decimal::from(2499)));

    Ok(())
}

#[tokio::test]
async fn test_history_persists_across_instances() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, "/dp/B0KEEP", product_page("Backpack", "1,250")).await;
    let dir = tempfile::tempdir()?;
    let config = get_test_config(dir.path());
    let target = target_at(&server, "/dp/B0KEEP", "1000");

    let (first, _) = create_test_watcher(&config)?;
    let report = first.check_now(&target).await?;
    drop(first);

    let (second, _) = create_test_watcher(&config)?;
    assert_eq!(second.history().await?, vec![report.observation]);

    second.reset_history().await?;
    assert!(second.history().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_check_cannot_write_into_another_products_history() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, "/dp/B0WATCHED", product_page("Headphones", "3,999")).await;
    mount_page(&server, "/dp/B0OTHER", product_page("Speaker", "1,499")).await;
    let dir = tempfile::tempdir()?;
    let config = get_test_config(dir.path());

    let (watching, _) = create_test_watcher(&config)?;
    watching.start_tracking(target_at(&server, "/dp/B0WATCHED", "3000")).await?;
    watching.stop().await?;

    let (checking, notifier) = create_test_watcher(&config)?;
    let result = checking.check_now(&target_at(&server, "/dp/B0OTHER", "2000")).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(notifier.events().is_empty());
    let history = checking.history().await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].price, Decimal::from(3999));

    Ok(())
}
