use issue_tracker::db::Db;
use issue_tracker::error::IssueError;
use issue_tracker::handler::{create_issue, list_issues, update_issue};
use issue_tracker::types::{Issue, IssueFields, IssueFilter};
use proptest::prelude::*;

fn open_db() -> Db {
    Db::open_in_memory().unwrap()
}

fn arb_project() -> impl Strategy<Value = String> {
    prop_oneof![Just("alpha"), Just("beta"), Just("gamma")].prop_map(String::from)
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof!["[a-zA-Z0-9 _-]{1,40}", "\\PC{1,20}",]
}

fn arb_opt_text() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), Just(Some(String::new())), arb_text().prop_map(Some)]
}

fn arb_create_fields() -> impl Strategy<Value = IssueFields> {
    (
        arb_text(),
        arb_text(),
        arb_text(),
        arb_opt_text(),
        arb_opt_text(),
    )
        .prop_map(
            |(issue_title, issue_text, created_by, assigned_to, status_text)| IssueFields {
                issue_title: Some(issue_title),
                issue_text: Some(issue_text),
                created_by: Some(created_by),
                assigned_to,
                status_text,
            },
        )
}

fn arb_update_fields() -> impl Strategy<Value = IssueFields> {
    (
        arb_opt_text(),
        arb_opt_text(),
        arb_opt_text(),
        arb_opt_text(),
        arb_opt_text(),
    )
        .prop_map(
            |(issue_title, issue_text, created_by, assigned_to, status_text)| IssueFields {
                issue_title,
                issue_text,
                created_by,
                assigned_to,
                status_text,
            },
        )
}

fn find(db: &Db, project: &str, id: &str) -> Issue {
    let filter = IssueFilter {
        id: Some(id.to_string()),
        ..Default::default()
    };
    let mut found = list_issues(db, project, &filter).unwrap();
    assert_eq!(found.len(), 1);
    found.remove(0)
}

// ---------------------------------------------------------------------------
// 1. Create echoes its input
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn create_echoes_fields(fields in arb_create_fields(), project in arb_project()) {
        let db = open_db();
        let issue = create_issue(&db, &project, &fields).unwrap();

        prop_assert_eq!(Some(&issue.issue_title), fields.issue_title.as_ref());
        prop_assert_eq!(Some(&issue.issue_text), fields.issue_text.as_ref());
        prop_assert_eq!(Some(&issue.created_by), fields.created_by.as_ref());
        prop_assert_eq!(&issue.assigned_to, &fields.assigned_to.clone().unwrap_or_default());
        prop_assert_eq!(&issue.status_text, &fields.status_text.clone().unwrap_or_default());
        prop_assert_eq!(&issue.project, &project);
        prop_assert!(issue.open);
        prop_assert_eq!(issue.created_on, issue.updated_on);
    }
}

// ---------------------------------------------------------------------------
// 2. List is scoped to its project
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn list_returns_all_and_only_project_issues(
        projects in proptest::collection::vec(arb_project(), 0..12),
        query in arb_project(),
    ) {
        let db = open_db();
        let mut expected = Vec::new();
        for (i, project) in projects.iter().enumerate() {
            let fields = IssueFields {
                issue_title: Some(format!("issue-{i}")),
                issue_text: Some("text".into()),
                created_by: Some("prop".into()),
                ..Default::default()
            };
            let issue = create_issue(&db, project, &fields).unwrap();
            if *project == query {
                expected.push(issue.id);
            }
        }

        let listed = list_issues(&db, &query, &IssueFilter::default()).unwrap();
        let ids: Vec<String> = listed.iter().map(|i| i.id.clone()).collect();
        prop_assert_eq!(ids, expected);
        prop_assert!(listed.iter().all(|i| i.project == query));
    }

    #[test]
    fn empty_filter_value_matches_omitted(
        titles in proptest::collection::vec(prop_oneof![Just("a"), Just("b")], 1..8),
        empty_keys in proptest::collection::vec(0..5usize, 0..5),
    ) {
        let db = open_db();
        for title in &titles {
            let fields = IssueFields {
                issue_title: Some(title.to_string()),
                issue_text: Some("text".into()),
                created_by: Some("prop".into()),
                ..Default::default()
            };
            create_issue(&db, "alpha", &fields).unwrap();
        }

        let mut with_empties = IssueFilter::default();
        for key in empty_keys {
            let slot = match key {
                0 => &mut with_empties.fields.issue_title,
                1 => &mut with_empties.fields.issue_text,
                2 => &mut with_empties.fields.created_by,
                3 => &mut with_empties.fields.assigned_to,
                _ => &mut with_empties.id,
            };
            *slot = Some(String::new());
        }

        prop_assert_eq!(
            list_issues(&db, "alpha", &with_empties).unwrap(),
            list_issues(&db, "alpha", &IssueFilter::default()).unwrap()
        );
    }
}

// ---------------------------------------------------------------------------
// 3. Sparse updates touch only what was sent
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn update_changes_only_sent_fields(
        create in arb_create_fields(),
        update in arb_update_fields(),
    ) {
        let db = open_db();
        let before = create_issue(&db, "alpha", &create).unwrap();

        let result = update_issue(&db, Some(&before.id), &update);
        let after = find(&db, "alpha", &before.id);

        if update.is_empty() {
            let is_no_fields = matches!(result, Err(IssueError::NoUpdateFields { .. }));
            prop_assert!(is_no_fields);
            prop_assert_eq!(after, before);
        } else {
            prop_assert!(result.is_ok());
            let pick = |new: &Option<String>, old: &String| match new.as_deref() {
                Some(v) if !v.is_empty() => v.to_string(),
                _ => old.clone(),
            };
            prop_assert_eq!(after.issue_title, pick(&update.issue_title, &before.issue_title));
            prop_assert_eq!(after.issue_text, pick(&update.issue_text, &before.issue_text));
            prop_assert_eq!(after.created_by, pick(&update.created_by, &before.created_by));
            prop_assert_eq!(after.assigned_to, pick(&update.assigned_to, &before.assigned_to));
            prop_assert_eq!(after.status_text, pick(&update.status_text, &before.status_text));
            prop_assert_eq!(after.created_on, before.created_on);
            prop_assert!(after.updated_on >= after.created_on);
            prop_assert!(after.open);
        }
    }

    #[test]
    fn invalid_ids_never_mutate(id in "[g-z0-9]{0,30}", update in arb_update_fields()) {
        prop_assume!(!issue_tracker::id::is_valid(&id));
        let db = open_db();
        let fields = IssueFields {
            issue_title: Some("T".into()),
            issue_text: Some("X".into()),
            created_by: Some("C".into()),
            ..Default::default()
        };
        let before = create_issue(&db, "alpha", &fields).unwrap();

        let result = update_issue(&db, Some(&id), &update);
        let is_invalid = matches!(result, Err(IssueError::MissingOrInvalidId));
        prop_assert!(is_invalid);
        prop_assert_eq!(find(&db, "alpha", &before.id), before);
    }
}
