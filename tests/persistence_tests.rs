use omnibus::{
    persistence::{self, Error, Settings, Snapshot},
    repository::{BusKind, Repository},
    router::{Router, RoutingSettings},
};

fn network() -> Repository {
    let mut repository = Repository::new();
    repository.add_stop("Tolstopaltsevo", (55.611087, 37.20829).into());
    repository.add_stop("Marushkino", (55.595884, 37.209755).into());
    repository.add_stop("Rasskazovka", (55.632761, 37.333324).into());
    repository.add_stop("Biryulyovo Zapadnoye", (55.574371, 37.6517).into());
    repository.add_stop("Biryusinka", (55.581065, 37.64839).into());
    repository.add_stop("Prazhskaya", (55.611678, 37.603831).into());
    repository
        .set_distance("Tolstopaltsevo", "Marushkino", 3900)
        .unwrap();
    repository
        .set_distance("Marushkino", "Rasskazovka", 9900)
        .unwrap();
    repository
        .set_distance("Rasskazovka", "Marushkino", 9500)
        .unwrap();
    repository
        .set_distance("Biryulyovo Zapadnoye", "Biryusinka", 1800)
        .unwrap();
    repository
        .add_bus(
            "750",
            BusKind::Linear,
            &["Tolstopaltsevo", "Marushkino", "Rasskazovka"],
        )
        .unwrap();
    repository
        .add_bus(
            "256",
            BusKind::Circular,
            &[
                "Biryulyovo Zapadnoye",
                "Biryusinka",
                "Rasskazovka",
                "Biryulyovo Zapadnoye",
            ],
        )
        .unwrap();
    repository
}

fn settings() -> RoutingSettings {
    RoutingSettings::new(30.0, 2.0)
}

#[test]
fn restored_router_answers_identically() {
    let repository = network();
    let mut router = Router::new(&repository).with_settings(settings());
    router.precompute().unwrap();

    let blob = persistence::export_state(&router, None).unwrap();
    let restored = persistence::import_state(&blob).unwrap();
    let restored_router = restored.router();

    assert!(restored_router.is_ready());
    assert_eq!(restored_router.settings(), router.settings());
    assert_eq!(restored_router.graph(), router.graph());
    assert_eq!(restored_router.table(), router.table());
    assert_eq!(restored.repository.distances(), repository.distances());

    for from in repository.all_stops() {
        for to in repository.all_stops() {
            assert_eq!(
                restored_router.route(&from.name, &to.name).unwrap(),
                router.route(&from.name, &to.name).unwrap(),
            );
        }
    }
    for bus in repository.all_buses() {
        assert_eq!(
            restored.repository.bus_info(&bus.name),
            repository.bus_info(&bus.name)
        );
    }
}

#[test]
fn export_requires_precomputed_state() {
    let repository = network();
    let router = Router::new(&repository);
    assert!(matches!(
        persistence::export_state(&router, None),
        Err(Error::NotReady)
    ));
}

#[test]
fn truncated_blob_is_rejected() {
    let repository = network();
    let mut router = Router::new(&repository);
    router.precompute().unwrap();
    let blob = persistence::export_state(&router, None).unwrap();
    assert!(matches!(
        persistence::import_state(&blob[..blob.len() / 2]),
        Err(Error::Json(_))
    ));
}

#[test]
fn newer_format_is_rejected() {
    let repository = network();
    let mut router = Router::new(&repository);
    router.precompute().unwrap();
    let mut snapshot = Snapshot::capture(&router).unwrap();
    snapshot.version += 1;
    let blob = serde_json::to_vec(&snapshot).unwrap();
    assert!(matches!(
        persistence::import_state(&blob),
        Err(Error::VersionMismatch { .. })
    ));
}

#[test]
fn state_of_another_network_is_rejected() {
    let repository = network();
    let mut router = Router::new(&repository);
    router.precompute().unwrap();

    let mut smaller = Repository::new();
    smaller.add_stop("Tolstopaltsevo", (55.611087, 37.20829).into());
    smaller.add_stop("Marushkino", (55.595884, 37.209755).into());
    smaller
        .add_bus("750", BusKind::Linear, &["Tolstopaltsevo", "Marushkino"])
        .unwrap();
    let mut other = Router::new(&smaller);
    other.precompute().unwrap();

    let mut snapshot = Snapshot::capture(&router).unwrap();
    snapshot.routing = other.export_state().unwrap();
    let blob = serde_json::to_vec(&snapshot).unwrap();
    assert!(matches!(
        persistence::import_state(&blob),
        Err(Error::Router(_))
    ));
    assert!(Router::restore(&repository, snapshot.routing).is_err());
}

#[test]
fn render_settings_survive_the_round_trip() {
    let repository = network();
    let mut router = Router::new(&repository);
    router.precompute().unwrap();
    let render_settings = serde_json::json!({
        "width": 1200.0,
        "height": 1200.0,
        "padding": 50.0,
        "color_palette": ["green", [255, 160, 0], "red"],
    });

    let snapshot = Snapshot::capture(&router)
        .unwrap()
        .with_render_settings(render_settings.clone());
    let blob = serde_json::to_vec(&snapshot).unwrap();
    let restored = persistence::import_state(&blob).unwrap();
    assert_eq!(restored.render_settings, Some(render_settings));
}

#[test]
fn save_and_load_file() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        file_name: dir.path().join("transport_catalogue.db"),
    };

    let repository = network();
    let mut router = Router::new(&repository);
    router.precompute().unwrap();
    let blob = persistence::export_state(&router, None).unwrap();
    persistence::save(&settings, &blob).unwrap();

    // Only the snapshot itself is left behind
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);

    let restored = persistence::load(&settings).unwrap();
    let restored_router = restored.router();
    assert_eq!(
        restored_router.route("Tolstopaltsevo", "Rasskazovka").unwrap(),
        router.route("Tolstopaltsevo", "Rasskazovka").unwrap()
    );
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        file_name: dir.path().join("missing.db"),
    };
    assert!(matches!(persistence::load(&settings), Err(Error::Io(_))));
}

#[test]
fn default_file_name() {
    assert_eq!(
        Settings::default().file_name,
        std::path::PathBuf::from("transport_catalogue.db")
    );
}

#[test]
fn snapshot_holds_the_routers_own_catalogue() {
    let mut smaller = Repository::new();
    smaller.add_stop("A1", (55.611087, 37.20829).into());
    smaller.add_stop("A2", (55.595884, 37.209755).into());
    smaller
        .add_bus("a", BusKind::Linear, &["A1", "A2"])
        .unwrap();
    let mut router = Router::new(&smaller);
    router.precompute().unwrap();

    let snapshot = Snapshot::capture(&router).unwrap();
    let names: Vec<&str> = snapshot.stops.iter().map(|stop| stop.name.as_str()).collect();
    assert_eq!(names, vec!["A1", "A2"]);
    assert_eq!(snapshot.buses.len(), 1);
    assert_eq!(snapshot.buses[0].name, "a");

    let restored = persistence::import_state(&serde_json::to_vec(&snapshot).unwrap()).unwrap();
    let mut rebuilt = Router::new(&restored.repository).with_settings(*router.settings());
    assert_eq!(
        restored.router().route("A1", "A2").unwrap(),
        rebuilt.find_route("A1", "A2").unwrap()
    );
}

#[test]
fn restored_routers_share_one_state() {
    let repository = network();
    let mut router = Router::new(&repository).with_settings(settings());
    router.precompute().unwrap();
    let blob = persistence::export_state(&router, None).unwrap();
    let restored = persistence::import_state(&blob).unwrap();

    assert_eq!(Some(restored.routing()), router.export_state().as_ref());
    let first = restored.router();
    let second = restored.router();
    assert!(first.is_ready() && second.is_ready());
    assert!(std::ptr::eq(first.table().unwrap(), second.table().unwrap()));
    assert!(std::ptr::eq(first.repository(), &restored.repository));
}
