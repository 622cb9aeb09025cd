//! Integration tests: relationship loading over the seeded directory.

use querybench::commands::{
    execute_loading_scenario, get_user_companies, get_user_emails, get_user_phones,
    run_loading_scenario, seed_directory, LoadStrategy, Scenario,
};
use querybench::db::schema::create_tables;
use querybench::db::Session;
use querybench::models::{ContactType, HarnessSettings};
use querybench::HarnessError;

fn seeded_session() -> Session {
    let mut session = Session::open("sqlite::memory:").expect("open");
    create_tables(&mut session).expect("create_tables");
    seed_directory(&mut session).expect("seed");
    session
}

fn statement_count(scenario: Scenario, strategy: LoadStrategy) -> usize {
    let mut session = seeded_session();
    run_loading_scenario(&mut session, scenario, strategy, None)
        .expect("scenario")
        .queries
        .len()
}

// ── Results ─────────────────────────────────────────────────────────

#[test]
fn companies_match_across_strategies() {
    let mut session = seeded_session();
    let baseline = get_user_companies(&mut session, LoadStrategy::Select).unwrap();

    let names: Vec<(&str, Option<&str>)> = baseline
        .iter()
        .map(|row| (row.name.as_str(), row.company_name.as_deref()))
        .collect();
    assert_eq!(
        names,
        vec![
            ("Tommaso D'Odorico", Some("Zinc co.")),
            ("Iain Brown", Some("Cobalt co.")),
            ("Peter Beckham", Some("Zinc co.")),
            ("Gordon Coupar", Some("Cobalt co.")),
            ("David Gentles", Some("Zinc co.")),
        ]
    );

    for strategy in LoadStrategy::ALL {
        assert_eq!(
            get_user_companies(&mut session, strategy).unwrap(),
            baseline,
            "{}",
            strategy
        );
    }
}

#[test]
fn emails_match_across_strategies() {
    let mut session = seeded_session();
    let baseline = get_user_emails(&mut session, LoadStrategy::Select).unwrap();

    assert_eq!(baseline.len(), 5);
    assert_eq!(baseline[0].emails.len(), 2);
    assert_eq!(baseline[0].emails[1].email, "tod@getadministrate.com");
    // David has no emails and still shows up
    assert_eq!(baseline[4].name, "David Gentles");
    assert!(baseline[4].emails.is_empty());

    for strategy in LoadStrategy::ALL {
        assert_eq!(
            get_user_emails(&mut session, strategy).unwrap(),
            baseline,
            "{}",
            strategy
        );
    }
}

#[test]
fn phone_type_filter_applies_under_every_strategy() {
    let mut session = seeded_session();
    for strategy in LoadStrategy::ALL {
        let home = get_user_phones(&mut session, strategy, Some(ContactType::Home)).unwrap();
        let numbers: Vec<(&str, Vec<&str>)> = home
            .iter()
            .map(|row| {
                (
                    row.name.as_str(),
                    row.phones.iter().map(|p| p.phone_number.as_str()).collect(),
                )
            })
            .collect();

        let expected: Vec<(&str, Vec<&str>)> = vec![
            ("Tommaso D'Odorico", vec!["111 111 1111"]),
            ("Iain Brown", vec!["555 555 5555"]),
            ("Peter Beckham", vec![]),
            ("Gordon Coupar", vec![]),
            ("David Gentles", vec![]),
        ];
        assert_eq!(numbers, expected, "{}", strategy);
    }
}

#[test]
fn unfiltered_phones_keep_insertion_order() {
    let mut session = seeded_session();
    let phones = get_user_phones(&mut session, LoadStrategy::Joined, None).unwrap();
    let tommaso: Vec<ContactType> = phones[0].phones.iter().map(|p| p.kind).collect();
    assert_eq!(tommaso, vec![ContactType::Home, ContactType::Work]);
    assert_eq!(phones[4].phones[0].phone_number, "444 444 4444");
}

// ── Statement counts ────────────────────────────────────────────────

#[test]
fn lazy_loading_issues_n_plus_one_statements() {
    assert_eq!(statement_count(Scenario::Companies, LoadStrategy::Select), 3);
    assert_eq!(statement_count(Scenario::Emails, LoadStrategy::Select), 6);
    assert_eq!(statement_count(Scenario::Phones, LoadStrategy::Select), 6);
}

#[test]
fn eager_strategies_use_one_or_two_statements() {
    for scenario in [Scenario::Companies, Scenario::Emails, Scenario::Phones] {
        assert_eq!(statement_count(scenario, LoadStrategy::Joined), 1);
        assert_eq!(statement_count(scenario, LoadStrategy::Subquery), 2);
        assert_eq!(statement_count(scenario, LoadStrategy::Selectin), 2);
    }
}

// ── Driver ──────────────────────────────────────────────────────────

#[test]
fn driver_seeds_once_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("directory.db");
    let settings = HarnessSettings::with_database_url(format!("sqlite://{}", path.display()));

    let first = execute_loading_scenario("emails", "joined", None, &settings).unwrap();
    let second = execute_loading_scenario("emails", "joined", None, &settings).unwrap();
    assert_eq!(first.results, second.results);
    assert_eq!(first.results.as_array().unwrap().len(), 5);
    assert_eq!(first.results[0]["emails"][0]["type"], "home");
}

#[test]
fn bad_arguments_are_configuration_errors() {
    let settings = HarnessSettings::with_database_url("sqlite::memory:");

    let err = execute_loading_scenario("orders", "joined", None, &settings).unwrap_err();
    assert!(matches!(err, HarnessError::UnknownScenario(_)));
    let err = execute_loading_scenario("phones", "dynamic", None, &settings).unwrap_err();
    assert!(matches!(err, HarnessError::UnknownLoadStrategy(_)));
    let err = execute_loading_scenario("phones", "joined", Some("mobile"), &settings).unwrap_err();
    assert!(matches!(err, HarnessError::InvalidContactType(_)));
    assert_eq!(err.exit_code(), 2);
}
