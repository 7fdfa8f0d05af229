use super::*;
use price_sentinel::JobStatus;

#[tokio::test]
async fn test_tracking_checks_immediately() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, "/dp/B0NOW", product_page("Desk Lamp", "899")).await;
    let dir = tempfile::tempdir()?;
    // Default hourly interval: only the immediate cycle can run in this test
    let (watcher, notifier) = create_test_watcher(&get_test_config(dir.path()))?;

    watcher.start_tracking(target_at(&server, "/dp/B0NOW", "900")).await?;

    let ran = wait_for_condition(|| async { watcher.job_info().await.run_count >= 1 }, 5).await;
    assert!(ran, "first cycle did not run");
    assert_eq!(watcher.history().await?.len(), 1);
    assert_eq!(notifier.events().len(), 1);

    watcher.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_tracking_repeats_on_interval() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, "/dp/B0TICK", product_page("Mouse", "1,099")).await;
    let dir = tempfile::tempdir()?;
    let (watcher, notifier) = create_fast_watcher(&get_test_config(dir.path()), Duration::from_millis(50))?;

    watcher.start_tracking(target_at(&server, "/dp/B0TICK", "1500")).await?;

    let repeated = wait_for_condition(|| async { watcher.job_info().await.success_count >= 3 }, 5).await;
    assert!(repeated, "loop did not repeat");
    watcher.stop().await?;

    let history = watcher.history().await?;
    assert!(history.len() >= 3);
    assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    // Every cycle below target alerts again
    assert_eq!(notifier.events().len(), history.len());

    Ok(())
}

#[tokio::test]
async fn test_failed_cycles_do_not_stop_the_loop() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dp/B0FLAKY"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_page(&server, "/dp/B0FLAKY", product_page("Router", "3,999")).await;
    let dir = tempfile::tempdir()?;
    let (watcher, _notifier) = create_fast_watcher(&get_test_config(dir.path()), Duration::from_millis(30))?;

    watcher.start_tracking(target_at(&server, "/dp/B0FLAKY", "3000")).await?;

    let recovered = wait_for_condition(|| async { watcher.job_info().await.success_count >= 1 }, 5).await;
    assert!(recovered, "loop never recovered");
    watcher.stop().await?;

    let job = watcher.job_info().await;
    assert_eq!(job.error_count, 2);
    assert_eq!(watcher.history().await?.len() as u64, job.success_count);

    Ok(())
}

#[tokio::test]
async fn test_manual_check_while_tracking() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_page(&server, "/dp/B0BOTH", product_page("Keyboard", "2,999")).await;
    let dir = tempfile::tempdir()?;
    let (watcher, _notifier) = create_test_watcher(&get_test_config(dir.path()))?;
    let target = target_at(&server, "/dp/B0BOTH", "2500");

    watcher.start_tracking(target.clone()).await?;
    let manual = watcher.check_now(&target).await?;

    let both = wait_for_condition(|| async { watcher.job_info().await.run_count >= 2 }, 5).await;
    assert!(both);
    watcher.stop().await?;

    let history = watcher.history().await?;
    assert_eq!(history.len(), 2);
    assert!(history.contains(&manual.observation));
    assert_eq!(watcher.job_info().await.manual_runs, 1);

    Ok(())
}

#[tokio::test]
async fn test_stop_lets_in_flight_cycle_finish() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dp/B0SLOW"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(product_page("Monitor", "9,999"))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    let dir = tempfile::tempdir()?;
    let (watcher, _notifier) = create_test_watcher(&get_test_config(dir.path()))?;

    watcher.start_tracking(target_at(&server, "/dp/B0SLOW", "5000")).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    watcher.stop().await?;

    assert_eq!(watcher.history().await?.len(), 1);
    let job = watcher.job_info().await;
    assert_eq!(job.status, JobStatus::Stopped);
    assert_eq!(job.success_count, 1);

    Ok(())
}
