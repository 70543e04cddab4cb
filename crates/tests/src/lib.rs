//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 目录快照测试
//! - 模拟 e2e 会话测试（无需 CARLA，无需窗口）

#[cfg(test)]
mod catalog_tests {
    use config_loader::CatalogLoader;

    #[test]
    fn test_builtin_catalog_snapshot() {
        let catalog = CatalogLoader::builtin().unwrap();

        assert_eq!(catalog.maps.len(), 10);
        assert!(catalog.contains_map("Town01"));
        assert!(catalog.contains_map("Town10HD"));
        assert_eq!(catalog.vehicles.len(), 35);
        assert_eq!(catalog.vehicles[0].display_name, "dodge charger");
        assert_eq!(
            catalog.find_vehicle("Tesla Model 3").unwrap().blueprint_id,
            "vehicle.tesla.model3"
        );
        let names: Vec<_> = catalog.weather_names().collect();
        assert!(names.contains(&"storm"));
        assert!(names.contains(&"clear"));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use actor_factory::{CarlaClient, Endpoint, MockCarlaClient, MockConfig, MockSensorConfig};
    use carla_control::{Session, SessionError, SessionOptions};
    use config_loader::CatalogLoader;
    use contracts::{ActorKind, Catalog};
    use display::{HeadlessLauncher, KeyState};
    use observability::SessionMetricsAggregator;
    use tokio::io::{AsyncWriteExt, BufReader};

    fn catalog() -> Arc<Catalog> {
        Arc::new(CatalogLoader::builtin().unwrap())
    }

    async fn client(config: MockConfig) -> Arc<MockCarlaClient> {
        let mut client = MockCarlaClient::with_config(config);
        client.connect(&Endpoint::default()).await.unwrap();
        Arc::new(client)
    }

    /// Small frames keep the mock camera cheap
    fn small_camera() -> MockConfig {
        MockConfig {
            camera: MockSensorConfig {
                frequency_hz: 50.0,
                image_width: 80,
                image_height: 60,
            },
            ..Default::default()
        }
    }

    fn options() -> SessionOptions {
        SessionOptions {
            seed: Some(7),
            frame_timeout: Duration::from_secs(2),
            ..Default::default()
        }
    }

    fn text(output: &[u8]) -> String {
        String::from_utf8_lossy(output).into_owned()
    }

    /// Add vehicle -> add pedestrian -> exit leaves nothing behind
    #[tokio::test]
    async fn test_e2e_spawn_and_exit() {
        let client = client(MockConfig::default()).await;
        let input = BufReader::new(&b"1\n2\n2\n6\n"[..]);
        let mut session = Session::new(
            client.clone(),
            catalog(),
            Arc::new(HeadlessLauncher::new()),
            input,
            Vec::new(),
            options(),
        );

        let report = session.run().await.unwrap();
        let out = text(session.output());

        assert!(out.contains("CARLA Simulator Control Menu:"));
        assert!(out.contains("Spawned vehicle: vehicle.dodge.charger_2020 at"));
        assert!(out.contains("Spawned pedestrian (id"));
        assert!(out.contains("Cleaning up spawned actors..."));
        assert!(out.ends_with("All actors destroyed. Exiting...\n"));

        // vehicle + camera + pedestrian
        assert_eq!(report.destroyed, 3);
        assert!(report.failed.is_empty());
        assert_eq!(report.summary.vehicles_spawned, 1);
        assert_eq!(report.summary.pedestrians_spawned, 1);
        assert_eq!(client.actor_count(), 0);
        assert!(session.registry().is_empty());

        let summary: &SessionMetricsAggregator = &report.summary;
        assert_eq!(summary.commands, 3);
        assert_eq!(summary.failed_commands, 0);
        let printed = summary.to_string();
        assert!(printed.contains("Spawned: 1 vehicles, 1 pedestrians"));
        assert!(printed.contains("Destroyed: 3 actors (0 failed)"));
    }

    /// End of input behaves like choosing exit
    #[tokio::test]
    async fn test_e2e_eof_cleans_up() {
        let client = client(MockConfig::default()).await;
        let input = BufReader::new(&b"1\nrandom\n1\n1\n"[..]);
        let mut session = Session::new(
            client.clone(),
            catalog(),
            Arc::new(HeadlessLauncher::new()),
            input,
            Vec::new(),
            options(),
        );

        let report = session.run().await.unwrap();

        assert_eq!(report.summary.vehicles_spawned, 2);
        assert_eq!(report.destroyed, 4);
        assert_eq!(client.actor_count(), 0);
        assert!(text(session.output()).contains("All actors destroyed. Exiting..."));
    }

    #[tokio::test]
    async fn test_e2e_unknown_names_keep_world() {
        let client = client(MockConfig::default()).await;
        let input = BufReader::new(&b"3\nsunny\n4\nAtlantis\n3\nstorm\n9\n6\n"[..]);
        let mut session = Session::new(
            client.clone(),
            catalog(),
            Arc::new(HeadlessLauncher::new()),
            input,
            Vec::new(),
            options(),
        );

        let report = session.run().await.unwrap();
        let out = text(session.output());

        assert!(out.contains("Error:"));
        assert!(out.contains("Weather changed to storm"));
        assert!(out.contains("Invalid choice. Please try again."));
        assert!(!out.contains("Map changed"));

        let storm = catalog().weather_preset("storm").copied().unwrap();
        assert_eq!(client.weather_history(), vec![storm]);
        assert!(client.map_loads().is_empty());
        // the invalid menu choice is not a failed command
        assert_eq!(report.summary.failed_commands, 2);
    }

    #[tokio::test]
    async fn test_e2e_unknown_vehicle_name_spawns_nothing() {
        let client = client(MockConfig::default()).await;
        let input = BufReader::new(&b"1\nhovercraft\n1\n99\n6\n"[..]);
        let mut session = Session::new(
            client.clone(),
            catalog(),
            Arc::new(HeadlessLauncher::new()),
            input,
            Vec::new(),
            options(),
        );

        let report = session.run().await.unwrap();

        assert_eq!(report.summary.vehicles_spawned, 0);
        assert_eq!(client.spawn_requests(), 0);
        assert_eq!(text(session.output()).matches("Error:").count(), 2);
    }

    #[tokio::test]
    async fn test_e2e_pov_renders_frame() {
        let client = client(small_camera()).await;
        let launcher = HeadlessLauncher::new();
        let probe = launcher.probe();
        let input = BufReader::new(&b"1\n2\n5\n0\n6\n"[..]);
        let mut session = Session::new(
            client.clone(),
            catalog(),
            Arc::new(launcher),
            input,
            Vec::new(),
            options(),
        );

        let report = session.run().await.unwrap();
        let out = text(session.output());

        assert!(out.contains("0. vehicle.dodge.charger_2020"));
        assert!(out.contains("Showing POV of vehicle.dodge.charger_2020"));
        assert_eq!(probe.presented(), 1);
        let frame = probe.last_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (800, 600));
        assert_eq!(report.summary.frames_rendered, 1);
        assert_eq!(client.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_e2e_pov_without_vehicles() {
        let client = client(MockConfig::default()).await;
        let input = BufReader::new(&b"5\n7\n6\n"[..]);
        let mut session = Session::new(
            client.clone(),
            catalog(),
            Arc::new(HeadlessLauncher::new()),
            input,
            Vec::new(),
            options(),
        );

        session.run().await.unwrap();
        let out = text(session.output());

        assert_eq!(out.matches("Error: no vehicles spawned yet").count(), 2);
    }

    #[tokio::test]
    async fn test_e2e_manual_driving_applies_controls() {
        let client = client(small_camera()).await;
        let launcher = HeadlessLauncher::new();
        let probe = launcher.probe();
        probe.set_keys(KeyState {
            forward: true,
            left: true,
            ..Default::default()
        });

        let (mut writer, reader) = tokio::io::duplex(64);
        let feeder = tokio::spawn(async move {
            writer.write_all(b"1\n2\n7\n0\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(400)).await;
            writer.write_all(b"6\n").await.unwrap();
        });

        let mut session = Session::new(
            client.clone(),
            catalog(),
            Arc::new(launcher),
            BufReader::new(reader),
            Vec::new(),
            options(),
        );

        let report = session.run().await.unwrap();
        feeder.await.unwrap();

        assert!(text(session.output()).contains("Manual driving enabled for"));
        let controls = client.vehicle_controls();
        assert!(!controls.is_empty());
        let (actor_id, control) = controls[0];
        assert_eq!(actor_id, 1000);
        assert_eq!(control.throttle, 1.0);
        assert_eq!(control.steer, -1.0);
        assert!(!control.reverse);
        assert!(report.summary.frames_rendered > 0);
        assert_eq!(client.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_e2e_toggle_twice_restores_autopilot() {
        let client = client(small_camera()).await;
        let input = BufReader::new(&b"1\n2\n7\n0\n7\n0\n"[..]);
        let mut session = Session::new(
            client.clone(),
            catalog(),
            Arc::new(HeadlessLauncher::new()),
            input,
            Vec::new(),
            options(),
        );

        let report = session.run().await.unwrap();
        assert_eq!(report.destroyed, 2);
        let out = text(session.output());

        assert!(out.contains("0. vehicle.dodge.charger_2020 [manual]"));
        assert!(out.contains("Manual driving disabled for vehicle.dodge.charger_2020"));
    }

    /// A dropped connection ends the session but cleanup still runs
    #[tokio::test]
    async fn test_e2e_connection_drop_is_fatal() {
        let client = client(MockConfig {
            // vehicle + camera succeed, the next spawn loses the connection
            drop_connection_after_spawns: Some(2),
            ..Default::default()
        })
        .await;
        let input = BufReader::new(&b"1\n2\n1\n2\n2\n6\n"[..]);
        let mut session = Session::new(
            client.clone(),
            catalog(),
            Arc::new(HeadlessLauncher::new()),
            input,
            Vec::new(),
            options(),
        );

        let err = session.run().await.unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, SessionError::Actor(_)));

        let out = text(session.output());
        assert!(!out.contains("Spawned pedestrian"));
        assert!(out.contains("All actors destroyed. Exiting..."));
        assert_eq!(client.actor_count(), 0);
    }

    /// A timed out request is reported and the menu comes back
    #[tokio::test]
    async fn test_e2e_request_timeout_is_recoverable() {
        let client = client(MockConfig {
            timeout_on_spawn: Some(0),
            ..Default::default()
        })
        .await;
        let input = BufReader::new(&b"1\n2\n1\n2\n6\n"[..]);
        let mut session = Session::new(
            client.clone(),
            catalog(),
            Arc::new(HeadlessLauncher::new()),
            input,
            Vec::new(),
            options(),
        );

        let report = session.run().await.unwrap();
        let out = text(session.output());

        assert!(out.contains("Error: request 'spawn_actor' timed out after 10.0s"));
        assert_eq!(out.matches("CARLA Simulator Control Menu:").count(), 3);
        assert_eq!(out.matches("Spawned vehicle:").count(), 1);
        assert_eq!(report.summary.failed_commands, 1);
        assert_eq!(report.destroyed, 2);
        assert_eq!(client.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_e2e_pov_rejects_bad_index() {
        let client = client(small_camera()).await;
        let launcher = HeadlessLauncher::new();
        let probe = launcher.probe();
        let input = BufReader::new(&b"1\n2\n5\nabc\n5\n9\n5\n+0\n6\n"[..]);
        let mut session = Session::new(
            client.clone(),
            catalog(),
            Arc::new(launcher),
            input,
            Vec::new(),
            options(),
        );

        let report = session.run().await.unwrap();
        let out = text(session.output());

        assert!(out.contains("Error: invalid index 'abc' (expected 0..1)\n"));
        assert!(out.contains("Error: invalid index '9' (expected 0..1)\n"));
        assert!(out.contains("Error: invalid index '+0' (expected 0..1)\n"));
        // menu after the spawn and after each rejected index
        assert_eq!(out.matches("CARLA Simulator Control Menu:").count(), 5);
        assert!(!out.contains("Showing POV"));
        assert_eq!(probe.presented(), 0);
        assert_eq!(report.summary.failed_commands, 3);
        assert_eq!(client.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_e2e_map_change_forgets_actors() {
        let client = client(MockConfig::default()).await;
        let input = BufReader::new(&b"1\n2\n2\n4\nTown01\n5\n6\n"[..]);
        let mut session = Session::new(
            client.clone(),
            catalog(),
            Arc::new(HeadlessLauncher::new()),
            input,
            Vec::new(),
            options(),
        );

        let report = session.run().await.unwrap();
        let out = text(session.output());

        assert!(out.contains("Map changed to Town01"));
        // the reload took the old actors with it
        assert!(out.contains("Error: no vehicles spawned yet"));
        assert_eq!(client.map_loads(), vec!["Town01".to_string()]);
        assert_eq!(report.destroyed, 0);
        assert!(report.failed.is_empty());
        assert_eq!(client.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_e2e_failed_destroy_is_reported() {
        let client = client(MockConfig {
            fail_destroy: vec![1000],
            ..Default::default()
        })
        .await;
        let input = BufReader::new(&b"1\n2\n2\n6\n"[..]);
        let mut session = Session::new(
            client.clone(),
            catalog(),
            Arc::new(HeadlessLauncher::new()),
            input,
            Vec::new(),
            options(),
        );

        let report = session.run().await.unwrap();

        assert_eq!(report.failed, vec![1000]);
        assert_eq!(report.destroyed, 2);
        assert_eq!(client.actor_count(), 1);
        assert_eq!(client.actor_count_of(ActorKind::Camera), 0);
        assert!(text(session.output()).contains("1 actors could not be destroyed. Exiting..."));
    }

    /// Mixed spawns are all drained by cleanup
    #[tokio::test]
    async fn test_e2e_mixed_spawns_drain_fully() {
        let client = client(MockConfig::default()).await;
        let input = BufReader::new(&b"1\n2\n1\n7\n2\n1\n1\n"[..]);
        let mut session = Session::new(
            client.clone(),
            catalog(),
            Arc::new(HeadlessLauncher::new()),
            input,
            Vec::new(),
            options(),
        );

        // Input ends without exit, registry is drained by cleanup
        let report = session.run().await.unwrap();
        assert_eq!(report.summary.vehicles_spawned, 3);
        assert_eq!(report.summary.pedestrians_spawned, 1);
        assert_eq!(report.destroyed, 7);
        assert!(session.registry().is_empty());
    }
}
