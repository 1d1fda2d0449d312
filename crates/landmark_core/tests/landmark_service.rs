use landmark_core::db::open_db_in_memory;
use landmark_core::service::lookup::{find_possible_values, hydrate, possible_values, serialize};
use landmark_core::{
    sqlite_service, Landmark, LandmarkServiceError, LandmarkValidationError, RepoError,
    SettingRepository, SqliteSettingRepository, ADDRESS_TEMPLATE_SETTING_KEY,
    DEFAULT_ADDRESS_TEMPLATE,
};
use rusqlite::Connection;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn save_requires_a_name() {
    let conn = setup();
    let service = sqlite_service(&conn).unwrap();

    for name in ["", "   "] {
        let err = service.save_landmark(&Landmark::new(name)).unwrap_err();
        assert!(matches!(
            err,
            LandmarkServiceError::Invalid(LandmarkValidationError::EmptyName)
        ));
        assert!(err.is_invalid_request());
    }

    let saved = service.save_landmark(&Landmark::new("  Clinic A  ")).unwrap();
    assert!(saved.id.is_some());
    assert_eq!(saved.name, "Clinic A");
    assert_eq!(
        service.get_landmark(saved.id.unwrap()).unwrap(),
        Some(saved.clone())
    );
    assert_eq!(
        service.get_landmark_by_uuid(saved.uuid).unwrap(),
        Some(saved)
    );
}

#[test]
fn save_enforces_unique_names() {
    let conn = setup();
    let service = sqlite_service(&conn).unwrap();

    let mut first = service.save_landmark(&Landmark::new("Bus Park")).unwrap();
    service
        .retire_landmark(&first, "replaced")
        .expect("retire should succeed");

    let err = service
        .save_landmark(&Landmark::new("Bus Park"))
        .unwrap_err();
    assert!(matches!(err, LandmarkServiceError::DuplicateName(ref name) if name == "Bus Park"));

    first.latitude = Some("0.1".to_string());
    service
        .save_landmark(&first)
        .expect("re-saving the same landmark keeps its own name");

    assert!(service.save_landmark(&Landmark::new("bus park")).is_ok());
}

#[test]
fn save_validates_parent_links() {
    let conn = setup();
    let service = sqlite_service(&conn).unwrap();

    let err = service
        .save_landmark(&Landmark::new("Orphan").child_of(77))
        .unwrap_err();
    assert!(matches!(err, LandmarkServiceError::ParentNotFound(77)));

    let a = service.save_landmark(&Landmark::new("A")).unwrap();
    let b = service
        .save_landmark(&Landmark::new("B").child_of(a.id.unwrap()))
        .unwrap();
    let c = service
        .save_landmark(&Landmark::new("C").child_of(b.id.unwrap()))
        .unwrap();

    let mut looped = a.clone();
    looped.parent_id = c.id;
    let err = service.save_landmark(&looped).unwrap_err();
    assert!(matches!(
        err,
        LandmarkServiceError::CycleDetected { landmark_id, parent_id }
            if landmark_id == a.id.unwrap() && parent_id == c.id.unwrap()
    ));

    let mut own_parent = a.clone();
    own_parent.parent_id = a.id;
    let err = service.save_landmark(&own_parent).unwrap_err();
    assert!(matches!(
        err,
        LandmarkServiceError::Invalid(LandmarkValidationError::SelfParent(_))
    ));

    let mut moved = c.clone();
    moved.parent_id = a.id;
    let moved = service.save_landmark(&moved).unwrap();
    assert_eq!(moved.parent_id, a.id);
}

#[test]
fn retire_requires_reason_and_hides_from_active_list() {
    let conn = setup();
    let service = sqlite_service(&conn).unwrap();

    let landmark = service.save_landmark(&Landmark::new("Ferry")).unwrap();
    let err = service.retire_landmark(&landmark, "  ").unwrap_err();
    assert!(matches!(err, LandmarkServiceError::MissingRetireReason));
    assert!(err.is_invalid_request());

    let retired = service.retire_landmark(&landmark, "X").unwrap();
    assert!(retired.retired);
    assert_eq!(retired.retire_reason.as_deref(), Some("X"));

    let active = service.list_landmarks(false).unwrap();
    assert!(active.iter().all(|item| item.id != retired.id));
    let all = service.get_all_landmarks().unwrap();
    assert!(all.iter().any(|item| item.id == retired.id && item.retired));
}

#[test]
fn default_search_excludes_retired_and_count_agrees() {
    let conn = setup();
    let service = sqlite_service(&conn).unwrap();

    for name in ["Stadium", "Station", "School"] {
        service.save_landmark(&Landmark::new(name)).unwrap();
    }
    let station = service.get_landmark_by_name("Station").unwrap().unwrap();
    service.retire_landmark(&station, "closed").unwrap();

    let hits = service.get_landmarks("st").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Stadium");

    assert_eq!(
        service.search_landmarks("", false, None, None).unwrap(),
        service.list_landmarks(false).unwrap()
    );
    assert_eq!(service.count_landmarks("st", true).unwrap(), 2);
    assert_eq!(
        service.count_landmarks("", false).unwrap(),
        service.search_landmarks("", false, None, None).unwrap().len() as u64
    );

    let page = service.search_landmarks("s", true, Some(1), Some(1)).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].name, "Stadium");
}

#[test]
fn prefix_lookup_matches_accented_names_in_any_case() {
    let conn = setup();
    let service = sqlite_service(&conn).unwrap();

    let egypt = service.save_landmark(&Landmark::new("Égypte Clinic")).unwrap();
    let ostra = service.save_landmark(&Landmark::new("Östra vårdcentral")).unwrap();

    assert_eq!(service.get_landmarks("égy").unwrap(), vec![egypt.clone()]);
    assert_eq!(service.get_landmarks("ÉGY").unwrap(), vec![egypt]);
    assert_eq!(service.get_landmarks("öst").unwrap(), vec![ostra]);
    assert_eq!(service.count_landmarks("ÖsT", false).unwrap(), 1);
}

#[test]
fn purge_reports_unsaved_and_blocked_landmarks() {
    let conn = setup();
    let service = sqlite_service(&conn).unwrap();

    let err = service.purge_landmark(&Landmark::new("Draft")).unwrap_err();
    assert!(matches!(err, LandmarkServiceError::Unsaved));

    let parent = service.save_landmark(&Landmark::new("Province")).unwrap();
    service
        .save_landmark(&Landmark::new("County").child_of(parent.id.unwrap()))
        .unwrap();

    let err = service.purge_landmark(&parent).unwrap_err();
    match err {
        LandmarkServiceError::Storage(ref inner) => assert!(inner.is_constraint_violation()),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_invalid_request());
    assert_eq!(service.get_root_landmarks(false).unwrap().len(), 1);
    assert_eq!(
        service
            .get_child_landmarks(parent.id.unwrap(), false)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn address_template_defaults_and_roundtrips() {
    let conn = setup();
    let service = sqlite_service(&conn).unwrap();

    assert_eq!(
        service.get_address_template().unwrap(),
        DEFAULT_ADDRESS_TEMPLATE
    );

    let err = service.save_address_template(" \n").unwrap_err();
    assert!(matches!(err, LandmarkServiceError::EmptyAddressTemplate));

    service.save_address_template("<x/>").unwrap();
    assert_eq!(service.get_address_template().unwrap(), "<x/>");

    let settings = SqliteSettingRepository::try_new(&conn).unwrap();
    settings
        .set_setting(ADDRESS_TEMPLATE_SETTING_KEY, "   ")
        .unwrap();
    assert_eq!(
        service.get_address_template().unwrap(),
        DEFAULT_ADDRESS_TEMPLATE
    );
}

#[test]
fn lookup_helpers_are_lenient() {
    let conn = setup();
    let service = sqlite_service(&conn).unwrap();

    let saved = service.save_landmark(&Landmark::new("Hospital")).unwrap();
    assert_eq!(find_possible_values(&service, "hos"), vec![saved.clone()]);
    assert_eq!(possible_values(&service), vec![saved.clone()]);

    let id_text = serialize(&saved);
    assert_eq!(hydrate(&service, &id_text), saved);

    let blank = hydrate(&service, "not-a-number");
    assert!(blank.id.is_none());
    assert!(blank.name.is_empty());
    assert!(hydrate(&service, "9999").id.is_none());
    assert_eq!(serialize(&Landmark::new("Unsaved")), "");

    conn.execute_batch("DROP TABLE landmarks;").unwrap();
    assert!(find_possible_values(&service, "hos").is_empty());
    assert!(possible_values(&service).is_empty());
    assert!(hydrate(&service, &id_text).id.is_none());
}

#[test]
fn storage_failures_propagate_unchanged() {
    let conn = setup();
    let service = sqlite_service(&conn).unwrap();

    conn.execute_batch("DROP TABLE global_properties;").unwrap();
    let err = service.get_address_template().unwrap_err();
    assert!(matches!(
        err,
        LandmarkServiceError::Storage(RepoError::Db(_))
    ));
}

#[test]
fn clinic_lifecycle_end_to_end() {
    let conn = setup();
    let service = sqlite_service(&conn).unwrap();

    let clinic = service.save_landmark(&Landmark::new("Clinic A")).unwrap();
    let id = clinic.id.expect("id assigned on save");

    let retired = service.retire_landmark(&clinic, "duplicate").unwrap();
    let listed = service
        .get_all_landmarks()
        .unwrap()
        .into_iter()
        .find(|item| item.id == Some(id))
        .unwrap();
    assert!(listed.retired);
    assert_eq!(listed.retire_reason.as_deref(), Some("duplicate"));

    let restored = service.unretire_landmark(&retired).unwrap();
    assert!(!restored.retired);
    assert_eq!(restored.retire_reason.as_deref(), Some("duplicate"));

    service.purge_landmark(&restored).unwrap();
    assert!(service.get_landmark(id).unwrap().is_none());
}
