use lesson_core::model::LessonId;
use lesson_core::time::fixed_clock;
use services::{AppServices, ServicesConfig, parse_records};

const RECORDS: &str = r#"[
    {"id": "c1", "area": "Civil", "module": "Contracts", "subject": "Offer", "orderKey": "10", "videoRef": "v/c1.mp4", "textContent": "short"},
    {"id": "p1", "area": "Penal", "module": "Crimes", "subject": "Intent", "orderKey": "5", "videoRef": "v/p1.mp4"},
    {"id": "c2", "area": "Civil", "module": "Contracts", "subject": "Acceptance", "orderKey": "20", "videoRef": "v/c2.mp4"},
    {"id": "c3", "area": "Civil", "module": "Torts", "subject": "Negligence", "orderKey": "30", "videoRef": "v/c3.mp4"}
]"#;

fn config(name: &str, namespace: &str) -> ServicesConfig {
    ServicesConfig {
        db_url: format!("sqlite:file:{name}?mode=memory&cache=shared"),
        namespace: namespace.to_string(),
        ..ServicesConfig::default()
    }
}

#[tokio::test]
async fn overview_reflects_sqlite_progress() {
    let services = AppServices::new_sqlite(config("memdb_catalog_overview", "lesson-progress"), fixed_clock())
        .await
        .unwrap();
    let catalog = services.catalog();
    let progress = services.progress();

    let tree = catalog.build(&parse_records(RECORDS).unwrap());
    assert_eq!(tree.areas[0].name(), "Penal");
    assert_eq!(tree.areas[1].modules()[0].lessons().len(), 2);

    progress.update(&LessonId::new("c1"), 540.0, 600.0).await.unwrap();
    progress.update(&LessonId::new("c2"), 60.0, 600.0).await.unwrap();

    let view = catalog.overview(&tree).await.unwrap();
    let civil = &view.areas[1];
    assert_eq!(civil.percent_complete, 33);
    assert_eq!(civil.modules[0].percent_complete, 50);
    assert_eq!(civil.modules[1].percent_complete, 0);
    assert_eq!(view.areas[0].percent_complete, 0);
    assert_eq!(view.percent_complete, 25);

    // Rollups read the leaves every time; a new completion shows at once.
    progress.update(&LessonId::new("c3"), 600.0, 600.0).await.unwrap();
    assert_eq!(progress.area_rollup(&tree.areas[1]).await.unwrap(), 67);
}

#[tokio::test]
async fn progress_survives_a_new_service_instance() {
    let first = AppServices::new_sqlite(config("memdb_catalog_restart", "course"), fixed_clock())
        .await
        .unwrap();
    first
        .progress()
        .update(&LessonId::new("c1"), 42.0, 600.0)
        .await
        .unwrap();

    let second = AppServices::new_sqlite(config("memdb_catalog_restart", "course"), fixed_clock())
        .await
        .unwrap();
    let resume = second
        .progress()
        .resume_position(&LessonId::new("c1"))
        .await
        .unwrap();
    assert!((resume - 42.0).abs() < f64::EPSILON);

    let other = AppServices::new_sqlite(config("memdb_catalog_restart", "other"), fixed_clock())
        .await
        .unwrap();
    assert!(
        other
            .progress()
            .get(&LessonId::new("c1"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn continue_watching_uses_last_access() {
    let services = AppServices::in_memory(ServicesConfig::default(), fixed_clock());
    let tree = services.catalog().build(&parse_records(RECORDS).unwrap());
    services
        .progress()
        .update(&LessonId::new("p1"), 30.0, 600.0)
        .await
        .unwrap();

    let items = services.catalog().continue_watching(&tree, 5).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].area, "Penal");
    assert_eq!(items[0].progress.percent_watched(), 5);
}
