use super::*;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, Default, PartialEq, formbind_record_derive::Record)]
struct Member {
    #[record(identity)]
    id: Option<u64>,
    email: String,
    nickname: Option<String>,
    birthdate: Option<NaiveDate>,
    active: bool,
}

#[allow(dead_code)]
struct Harness {
    id_field: Arc<MemoryField>,
    email_field: Arc<MemoryField>,
    nickname_field: Arc<MemoryField>,
    birthdate_field: Arc<MemoryField>,
    active_field: Arc<MemoryField>,
    root: UiRoot,
}

fn harness() -> Harness {
    let id_field = MemoryField::new(FieldKind::Text);
    let email_field = MemoryField::new(FieldKind::Text);
    let nickname_field = MemoryField::new(FieldKind::Text);
    let birthdate_field = MemoryField::new(FieldKind::Date);
    let active_field = MemoryField::new(FieldKind::Flag);
    let root = UiRoot::new()
        .with("idLineEdit", id_field.clone())
        .with("emailLineEdit", email_field.clone())
        .with("nicknameLineEdit", nickname_field.clone())
        .with("birthdateDateEdit", birthdate_field.clone())
        .with("activeCheckBox", active_field.clone());
    Harness {
        id_field,
        email_field,
        nickname_field,
        birthdate_field,
        active_field,
        root,
    }
}

fn member_store() -> MemoryStore<Member> {
    MemoryStore::new(|member| member.id, |member, id| member.id = Some(id))
}

fn member_registry(harness: &Harness) -> BinderRegistry<Member> {
    let fields = Member::fields();
    BinderRegistry::new().supply(
        FieldBinder::auto(fields.email(), harness.email_field.clone())
            .expect("text codec for email")
            .required(true)
            .boxed(),
    )
}

fn bind_create(
    harness: &Harness,
    store: MemoryStore<Member>,
    options: CoordinatorOptions,
) -> FormCoordinator<Member, MemoryStore<Member>> {
    FormCoordinator::create(store, member_registry(harness), &harness.root, options)
        .expect("coordinator must bind")
}

fn collect_events(
    coordinator: &FormCoordinator<Member, MemoryStore<Member>>,
) -> Arc<Mutex<Vec<FormEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    coordinator
        .subscribe(move |event| sink.lock().expect("event sink").push(event.clone()))
        .expect("subscribe");
    events
}

const EMAIL: AttrKey = AttrKey::new("email");

#[test]
fn derive_generates_lenses_keys_and_identity() {
    let fields = Member::fields();
    assert_eq!(fields.email().key().as_str(), "email");
    assert_eq!(fields.birthdate().key().as_str(), "birthdate");
    assert_eq!(Member::identity_attr(), Some(AttrKey::new("id")));

    let mut member = Member::default();
    assert!(!member.has_identity());
    fields.email().set(&mut member, "r2d2@droids.org".to_owned());
    assert_eq!(fields.email().get(&member), "r2d2@droids.org");
    assert_eq!(
        member.attr_display(EMAIL).as_deref(),
        Some("r2d2@droids.org")
    );
    assert_eq!(member.attr_display(AttrKey::new("missing")), None);
}

#[test]
fn convention_resolution_binds_named_components_only() {
    let harness = harness();
    let coordinator = bind_create(&harness, member_store(), CoordinatorOptions::default());
    let bound = coordinator.bound_attrs();
    assert_eq!(
        bound,
        vec![
            AttrKey::new("active"),
            AttrKey::new("birthdate"),
            EMAIL,
            AttrKey::new("id"),
            AttrKey::new("nickname"),
        ]
    );
}

#[test]
fn unmatched_attributes_stay_unbound_without_error() {
    let harness = harness();
    let root = UiRoot::new()
        .with("emailLineEdit", harness.email_field.clone())
        .with("unrelatedLineEdit", MemoryField::new(FieldKind::Text));
    let coordinator = FormCoordinator::create(
        member_store(),
        member_registry(&harness),
        &root,
        CoordinatorOptions::default(),
    )
    .expect("email alone is enough to bind");
    assert_eq!(coordinator.bound_attrs(), vec![EMAIL]);
}

#[test]
fn empty_ui_root_fails_binding() {
    let result = FormCoordinator::<Member, _>::create(
        member_store(),
        BinderRegistry::new(),
        &UiRoot::new(),
        CoordinatorOptions::default(),
    );
    assert_eq!(result.err(), Some(FormError::BindersNotFound));
}

#[test]
fn add_mode_disables_refresh_and_delete_triggers() {
    let harness = harness();
    let coordinator = bind_create(&harness, member_store(), CoordinatorOptions::default());
    assert_eq!(coordinator.mode().expect("mode"), Mode::Add);
    assert_eq!(
        coordinator.actions().expect("actions"),
        ActionState {
            save: true,
            refresh: false,
            delete: false,
        }
    );
    assert_eq!(
        coordinator.refresh(),
        Err(FormError::InvalidOperation {
            action: "refresh",
            mode: Mode::Add,
        })
    );
    assert_eq!(
        coordinator.delete(),
        Err(FormError::InvalidOperation {
            action: "delete",
            mode: Mode::Add,
        })
    );
}

#[test]
fn instance_with_identity_binds_in_edit_mode() {
    let harness = harness();
    let store = member_store();
    let id = store.seed(Member {
        email: "obiwan@jedi.org".to_owned(),
        ..Member::default()
    });
    let record = store.committed_by_id(id).expect("seeded");
    let coordinator = FormCoordinator::new(
        record,
        store,
        member_registry(&harness),
        &harness.root,
        CoordinatorOptions::default(),
    )
    .expect("bind");
    assert_eq!(coordinator.mode().expect("mode"), Mode::Edit);
    assert_eq!(
        coordinator.actions().expect("actions"),
        ActionState {
            save: true,
            refresh: true,
            delete: true,
        }
    );
    assert_eq!(
        harness.email_field.value(),
        UiValue::Text("obiwan@jedi.org".to_owned())
    );
}

#[test]
fn validate_success_then_ui_change_returns_to_unvalidated() {
    let harness = harness();
    let coordinator = bind_create(&harness, member_store(), CoordinatorOptions::default());

    harness
        .email_field
        .edit(UiValue::Text("yoda@jedi.org".to_owned()));
    assert_eq!(
        coordinator.validation_state(EMAIL).expect("state"),
        Some(ValidationState::Unvalidated)
    );

    assert!(coordinator.validate().expect("validate"));
    assert_eq!(
        coordinator.validation_state(EMAIL).expect("state"),
        Some(ValidationState::Valid)
    );

    harness
        .email_field
        .edit(UiValue::Text("yoda@dagobah.org".to_owned()));
    assert_eq!(
        coordinator.validation_state(EMAIL).expect("state"),
        Some(ValidationState::Unvalidated)
    );
}

#[test]
fn save_with_empty_required_field_names_it_and_skips_the_store() {
    let harness = harness();
    let store = member_store();
    let coordinator = bind_create(&harness, store.clone(), CoordinatorOptions::default());
    let events = collect_events(&coordinator);

    let result = coordinator.save();
    assert_eq!(result, Err(FormError::ValidationFailed(vec![EMAIL])));
    assert_eq!(store.counts(), StoreCounts::default());
    assert_eq!(coordinator.status().expect("status"), FormStatus::Error);
    assert_eq!(
        coordinator.validation_state(EMAIL).expect("state"),
        Some(ValidationState::Invalid)
    );
    assert!(
        events
            .lock()
            .expect("events")
            .contains(&FormEvent::ValidationFailed(vec![EMAIL]))
    );
}

#[test]
fn save_commits_refreshes_and_flips_to_edit() {
    let harness = harness();
    let store = member_store();
    let coordinator = bind_create(&harness, store.clone(), CoordinatorOptions::default());
    let events = collect_events(&coordinator);

    harness
        .email_field
        .edit(UiValue::Text("luke@jedi.org".to_owned()));
    harness
        .birthdate_field
        .edit(UiValue::Text("1977-05-25".to_owned()));
    coordinator.save().expect("save");

    let record = coordinator.record().expect("record");
    assert_eq!(record.id, Some(1));
    assert_eq!(record.email, "luke@jedi.org");
    assert_eq!(
        record.birthdate,
        NaiveDate::from_ymd_opt(1977, 5, 25)
    );
    assert_eq!(coordinator.mode().expect("mode"), Mode::Edit);
    assert_eq!(coordinator.status().expect("status"), FormStatus::Clean);
    assert_eq!(
        coordinator.validation_state(EMAIL).expect("state"),
        Some(ValidationState::Unvalidated)
    );
    assert_eq!(harness.id_field.value(), UiValue::Text("1".to_owned()));
    assert!(
        events
            .lock()
            .expect("events")
            .contains(&FormEvent::StatusChanged(FormStatus::Clean))
    );
}

#[test]
fn saving_twice_without_edits_is_idempotent() {
    let harness = harness();
    let store = member_store();
    let coordinator = bind_create(&harness, store.clone(), CoordinatorOptions::default());

    harness
        .email_field
        .edit(UiValue::Text("han@falcon.sw".to_owned()));
    coordinator.save().expect("first save");
    coordinator.save().expect("second save");

    assert_eq!(store.committed().len(), 1);
    assert_eq!(store.counts().commits, 2);
    assert_eq!(coordinator.record().expect("record").id, Some(1));
    assert_eq!(coordinator.status().expect("status"), FormStatus::Clean);
}

#[test]
fn identity_field_stays_disabled_through_an_edit_cycle() {
    let harness = harness();
    let store = member_store();
    let id = store.seed(Member {
        email: "old@endor.net".to_owned(),
        ..Member::default()
    });
    let record = store.committed_by_id(id).expect("seeded");
    let coordinator = FormCoordinator::new(
        record,
        store.clone(),
        member_registry(&harness),
        &harness.root,
        CoordinatorOptions::default(),
    )
    .expect("bind");

    assert!(!harness.id_field.enabled());
    assert_eq!(
        harness.id_field.message().as_deref(),
        Some("auto-generated")
    );

    harness
        .email_field
        .edit(UiValue::Text("new@endor.net".to_owned()));
    assert_eq!(
        coordinator.status().expect("status"),
        FormStatus::PendingChanges
    );
    coordinator.save().expect("save");

    assert_eq!(
        store.committed_by_id(id).expect("still present").email,
        "new@endor.net"
    );
    assert_eq!(coordinator.status().expect("status"), FormStatus::Clean);
    assert!(!harness.id_field.enabled());
}

#[test]
fn commit_failure_rolls_back_once_and_preserves_ui_values() {
    let harness = harness();
    let store = member_store();
    let coordinator = bind_create(&harness, store.clone(), CoordinatorOptions::default());
    let events = collect_events(&coordinator);

    harness
        .email_field
        .edit(UiValue::Text("chewie@falcon.sw".to_owned()));
    store.reject_next_commit();

    let result = coordinator.save();
    assert_eq!(
        result,
        Err(FormError::CommitFailed("commit rejected".to_owned()))
    );
    assert_eq!(store.counts().rollbacks, 1);
    assert!(store.committed().is_empty());
    assert_eq!(
        harness.email_field.value(),
        UiValue::Text("chewie@falcon.sw".to_owned())
    );
    assert_eq!(coordinator.mode().expect("mode"), Mode::Add);
    assert!(
        events
            .lock()
            .expect("events")
            .contains(&FormEvent::CommitFailed("commit rejected".to_owned()))
    );
}

#[test]
fn refresh_reloads_store_values_without_revalidating() {
    let harness = harness();
    let store = member_store();
    let id = store.seed(Member {
        email: "before@base.sw".to_owned(),
        ..Member::default()
    });
    let record = store.committed_by_id(id).expect("seeded");
    let coordinator = FormCoordinator::new(
        record,
        store.clone(),
        member_registry(&harness),
        &harness.root,
        CoordinatorOptions::default(),
    )
    .expect("bind");

    harness
        .email_field
        .edit(UiValue::Text("scratch@base.sw".to_owned()));
    let mut changed = store.committed_by_id(id).expect("present");
    changed.email = "after@base.sw".to_owned();
    store.seed(changed);

    coordinator.refresh().expect("refresh");
    assert_eq!(
        harness.email_field.value(),
        UiValue::Text("after@base.sw".to_owned())
    );
    assert_eq!(
        coordinator.validation_state(EMAIL).expect("state"),
        Some(ValidationState::Unvalidated)
    );
    assert_eq!(coordinator.status().expect("status"), FormStatus::Clean);
}

#[test]
fn delete_commits_and_emits_deleted() {
    let harness = harness();
    let store = member_store();
    let id = store.seed(Member {
        email: "doomed@deathstar.sw".to_owned(),
        ..Member::default()
    });
    let record = store.committed_by_id(id).expect("seeded");
    let coordinator = FormCoordinator::new(
        record,
        store.clone(),
        member_registry(&harness),
        &harness.root,
        CoordinatorOptions::default(),
    )
    .expect("bind");
    let events = collect_events(&coordinator);

    coordinator.delete().expect("delete");
    assert!(store.committed_by_id(id).is_none());
    assert!(events.lock().expect("events").contains(&FormEvent::Deleted));
}

#[test]
fn autosave_saves_on_a_single_ui_change() {
    let harness = harness();
    let store = member_store();
    let coordinator = bind_create(
        &harness,
        store.clone(),
        CoordinatorOptions {
            autosave: true,
            ..CoordinatorOptions::default()
        },
    );

    harness
        .email_field
        .edit(UiValue::Text("lando@bespin.sw".to_owned()));

    assert_eq!(store.committed().len(), 1);
    assert_eq!(store.counts().commits, 1);
    assert_eq!(coordinator.mode().expect("mode"), Mode::Edit);
    assert_eq!(coordinator.status().expect("status"), FormStatus::Clean);
}

#[test]
fn disabled_binder_ignores_ui_changes_until_reenabled() {
    let harness = harness();
    let coordinator = bind_create(&harness, member_store(), CoordinatorOptions::default());

    coordinator
        .set_binder_enabled(EMAIL, false)
        .expect("disable email");
    assert!(!harness.email_field.enabled());
    harness
        .email_field
        .edit(UiValue::Text("ignored@change.sw".to_owned()));
    assert_eq!(coordinator.status().expect("status"), FormStatus::Clean);

    coordinator
        .set_binder_enabled(EMAIL, true)
        .expect("re-enable email");
    harness
        .email_field
        .edit(UiValue::Text("seen@change.sw".to_owned()));
    assert_eq!(
        coordinator.status().expect("status"),
        FormStatus::PendingChanges
    );
}

#[test]
fn identity_binder_cannot_be_reenabled() {
    let harness = harness();
    let coordinator = bind_create(&harness, member_store(), CoordinatorOptions::default());
    coordinator
        .set_binder_enabled(AttrKey::new("id"), true)
        .expect("toggle is ignored");
    assert!(!harness.id_field.enabled());
}

#[test]
fn fill_then_extract_is_identity_on_the_record() {
    let fields = Member::fields();
    let birthdate_field = MemoryField::new(FieldKind::Date);
    let binder =
        FieldBinder::auto(fields.birthdate(), birthdate_field).expect("date codec for birthdate");

    let original = Member {
        birthdate: NaiveDate::from_ymd_opt(1980, 5, 21),
        ..Member::default()
    };
    let mut extracted = Member::default();
    binder.fill_from_record(&original);
    binder
        .apply_to_record(&mut extracted)
        .expect("round trip conversion");
    assert_eq!(extracted.birthdate, original.birthdate);
}

#[test]
fn results_model_lists_committed_records() {
    let store = member_store();
    store.seed(Member {
        email: "ackbar@fleet.sw".to_owned(),
        ..Member::default()
    });
    store.seed(Member {
        email: "wedge@fleet.sw".to_owned(),
        ..Member::default()
    });
    store.seed(Member {
        email: "biggs@academy.sw".to_owned(),
        ..Member::default()
    });

    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let sink = outcomes.clone();
    let mut results = ResultsModel::<Member>::with_spec(
        QuerySpec::all::<Member>().filter(Filter::new(EMAIL, QueryOp::ILike, "FLEET")),
    );
    results.on_refresh(move |outcome| sink.lock().expect("outcomes").push(outcome.clone()));

    let loaded = results.refresh(&store).expect("search");
    assert_eq!(loaded, 2);
    assert_eq!(
        outcomes.lock().expect("outcomes").as_slice(),
        &[RefreshOutcome::Loaded(2)]
    );

    results
        .sort_by(EMAIL, SortOrder::Descending, &store)
        .expect("sorted search");
    let email_column = results
        .headers()
        .iter()
        .position(|header| *header == "email")
        .expect("email column");
    assert_eq!(
        results.cell(0, email_column).as_deref(),
        Some("wedge@fleet.sw")
    );
    assert_eq!(
        results.cell(1, email_column).as_deref(),
        Some("ackbar@fleet.sw")
    );
}

#[test]
fn results_model_applies_the_row_limit() {
    let store = member_store();
    for index in 0..5 {
        store.seed(Member {
            email: format!("pilot{index}@fleet.sw"),
            ..Member::default()
        });
    }
    let mut results =
        ResultsModel::<Member>::with_spec(QuerySpec::all::<Member>().limit(Some(3)));
    assert_eq!(results.refresh(&store).expect("search"), 3);
    assert_eq!(results.row_count(), 3);
    assert_eq!(results.column_count(), Member::attr_keys().len());
}
