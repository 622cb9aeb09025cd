//! Relationship loading: the same three reads over the Company/User/Email/
//! PhoneNumber fixture, run lazily (N+1) or eagerly (joined, subquery,
//! select-in) so the statement counts can be compared.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::db::schema;
use crate::db::{Dialect, Session};
use crate::error::{HarnessError, Result};
use crate::models::{
    CapturedQuery, Company, ContactType, Email, HarnessSettings, PhoneNumber, Row, SqlValue, User,
};
use crate::recorder::record_queries;
use crate::timer::measure_time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStrategy {
    /// Parent query, then one query per relationship access
    Select,
    /// Single LEFT OUTER JOIN
    Joined,
    /// Second query joined against the parent query as a subquery
    Subquery,
    /// Second query with `IN (...)` over the parent ids
    Selectin,
}

impl LoadStrategy {
    pub const ALL: [LoadStrategy; 4] = [
        LoadStrategy::Select,
        LoadStrategy::Joined,
        LoadStrategy::Subquery,
        LoadStrategy::Selectin,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LoadStrategy::Select => "select",
            LoadStrategy::Joined => "joined",
            LoadStrategy::Subquery => "subquery",
            LoadStrategy::Selectin => "selectin",
        }
    }
}

impl std::fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for LoadStrategy {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        LoadStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| HarnessError::UnknownLoadStrategy(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Companies,
    Emails,
    Phones,
}

impl Scenario {
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Companies => "companies",
            Scenario::Emails => "emails",
            Scenario::Phones => "phones",
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Scenario {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "companies" => Ok(Scenario::Companies),
            "emails" => Ok(Scenario::Emails),
            "phones" => Ok(Scenario::Phones),
            _ => Err(HarnessError::UnknownScenario(s.to_string())),
        }
    }
}

// ==================== Result rows ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserCompany {
    pub name: String,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailView {
    #[serde(rename = "type")]
    pub kind: ContactType,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserEmails {
    pub name: String,
    pub emails: Vec<EmailView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhoneView {
    #[serde(rename = "type")]
    pub kind: ContactType,
    pub phone_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserPhones {
    pub name: String,
    pub phones: Vec<PhoneView>,
}

// ==================== Scenarios ====================

const USERS_SQL: &str = "SELECT id, name, company_id FROM users ORDER BY id";

fn user_from_row(row: &Row) -> Result<User> {
    Ok(User {
        id: row.get_i64(0, "id")?,
        name: row.get_text(1, "name")?,
        company_id: row.get_opt_i64(2, "company_id")?,
    })
}

fn load_users(session: &mut Session) -> Result<Vec<User>> {
    session.query(USERS_SQL, &[])?.iter().map(user_from_row).collect()
}

/// Every user with the name of their company.
pub fn get_user_companies(session: &mut Session, strategy: LoadStrategy) -> Result<Vec<UserCompany>> {
    if strategy == LoadStrategy::Joined {
        let rows = session.query(
            "SELECT u.id, u.name, c.name FROM users u \
             LEFT OUTER JOIN companies c ON c.id = u.company_id ORDER BY u.id",
            &[],
        )?;
        return rows
            .iter()
            .map(|row| {
                Ok(UserCompany {
                    name: row.get_text(1, "name")?,
                    company_name: row.get_opt_text(2, "company_name")?,
                })
            })
            .collect();
    }

    let users = load_users(session)?;
    let dialect = session.dialect();

    let mut companies: HashMap<i64, String> = HashMap::new();
    match strategy {
        LoadStrategy::Subquery => {
            let rows = session.query(
                "SELECT c.id, c.name FROM companies c \
                 JOIN (SELECT DISTINCT company_id FROM users) AS parent ON c.id = parent.company_id",
                &[],
            )?;
            for row in rows {
                companies.insert(row.get_i64(0, "id")?, row.get_text(1, "name")?);
            }
        }
        LoadStrategy::Selectin => {
            let mut ids: Vec<i64> = users.iter().filter_map(|u| u.company_id).collect();
            ids.sort_unstable();
            ids.dedup();
            if !ids.is_empty() {
                let sql = format!(
                    "SELECT id, name FROM companies WHERE id IN ({})",
                    dialect.placeholders(1, ids.len())
                );
                let params: Vec<SqlValue> = ids.into_iter().map(SqlValue::from).collect();
                for row in session.query(&sql, &params)? {
                    companies.insert(row.get_i64(0, "id")?, row.get_text(1, "name")?);
                }
            }
        }
        _ => {
            // Many-to-one lazy loads hit the identity cache after the first access
            let sql = format!(
                "SELECT id, name FROM companies WHERE id = {}",
                dialect.placeholder(1)
            );
            for company_id in users.iter().filter_map(|u| u.company_id) {
                if companies.contains_key(&company_id) {
                    continue;
                }
                if let Some(row) = session.query(&sql, &[SqlValue::from(company_id)])?.first() {
                    companies.insert(company_id, row.get_text(1, "name")?);
                }
            }
        }
    }

    Ok(users
        .into_iter()
        .map(|user| UserCompany {
            company_name: user.company_id.and_then(|id| companies.get(&id).cloned()),
            name: user.name,
        })
        .collect())
}

/// Every user with all of their email addresses.
pub fn get_user_emails(session: &mut Session, strategy: LoadStrategy) -> Result<Vec<UserEmails>> {
    let loaded = load_with_contacts(session, strategy, EMAILS, None)?;
    Ok(loaded
        .into_iter()
        .map(|(user, contacts)| UserEmails {
            name: user.name,
            emails: contacts
                .into_iter()
                .map(|c| EmailView {
                    kind: c.kind,
                    email: c.value,
                })
                .collect(),
        })
        .collect())
}

/// Every user with their phone numbers, optionally only one type.
pub fn get_user_phones(
    session: &mut Session,
    strategy: LoadStrategy,
    phone_type: Option<ContactType>,
) -> Result<Vec<UserPhones>> {
    let loaded = load_with_contacts(session, strategy, PHONES, phone_type)?;
    Ok(loaded
        .into_iter()
        .map(|(user, contacts)| UserPhones {
            name: user.name,
            phones: contacts
                .into_iter()
                .map(|c| PhoneView {
                    kind: c.kind,
                    phone_number: c.value,
                })
                .collect(),
        })
        .collect())
}

// ==================== One-to-many loading ====================

/// A one-to-many contact table hanging off `users`.
#[derive(Debug, Clone, Copy)]
struct ContactTable {
    table: &'static str,
    value_column: &'static str,
}

const EMAILS: ContactTable = ContactTable {
    table: "emails",
    value_column: "email",
};

const PHONES: ContactTable = ContactTable {
    table: "phone_numbers",
    value_column: "phone_number",
};

struct Contact {
    kind: ContactType,
    value: String,
}

/// Parse `(user_id, type, value)` starting at column `offset`.
fn contact_from_row(row: &Row, offset: usize) -> Result<(i64, Contact)> {
    let user_id = row.get_i64(offset, "user_id")?;
    let kind = row.get_text(offset + 1, "type")?.parse()?;
    let value = row.get_text(offset + 2, "value")?;
    Ok((user_id, Contact { kind, value }))
}

fn group_by_user(rows: &[Row]) -> Result<HashMap<i64, Vec<Contact>>> {
    let mut grouped: HashMap<i64, Vec<Contact>> = HashMap::new();
    for row in rows {
        let (user_id, contact) = contact_from_row(row, 0)?;
        grouped.entry(user_id).or_default().push(contact);
    }
    Ok(grouped)
}

fn load_with_contacts(
    session: &mut Session,
    strategy: LoadStrategy,
    contacts: ContactTable,
    kind: Option<ContactType>,
) -> Result<Vec<(User, Vec<Contact>)>> {
    let dialect = session.dialect();
    let ContactTable {
        table,
        value_column,
    } = contacts;

    if strategy == LoadStrategy::Joined {
        let (filter, params) = type_filter(dialect, "AND c.type", 1, kind);
        let sql = format!(
            "SELECT u.id, u.name, u.company_id, c.user_id, c.type, c.{value_column} \
             FROM users u LEFT OUTER JOIN {table} c ON c.user_id = u.id{filter} \
             ORDER BY u.id, c.id"
        );
        return collapse_joined(&session.query(&sql, &params)?);
    }

    let users = load_users(session)?;
    let mut grouped = match strategy {
        LoadStrategy::Subquery => {
            let (filter, params) = type_filter(dialect, "WHERE c.type", 1, kind);
            let sql = format!(
                "SELECT c.user_id, c.type, c.{value_column} FROM {table} c \
                 JOIN (SELECT id FROM users) AS parent ON c.user_id = parent.id{filter} \
                 ORDER BY c.user_id, c.id"
            );
            group_by_user(&session.query(&sql, &params)?)?
        }
        LoadStrategy::Selectin if users.is_empty() => HashMap::new(),
        LoadStrategy::Selectin => {
            let (filter, type_params) = type_filter(dialect, "AND type", users.len() + 1, kind);
            let sql = format!(
                "SELECT user_id, type, {value_column} FROM {table} \
                 WHERE user_id IN ({}){filter} ORDER BY user_id, id",
                dialect.placeholders(1, users.len())
            );
            let mut params: Vec<SqlValue> = users.iter().map(|u| SqlValue::from(u.id)).collect();
            params.extend(type_params);
            group_by_user(&session.query(&sql, &params)?)?
        }
        _ => {
            let (filter, type_params) = type_filter(dialect, "AND type", 2, kind);
            let sql = format!(
                "SELECT user_id, type, {value_column} FROM {table} \
                 WHERE user_id = {}{filter} ORDER BY id",
                dialect.placeholder(1)
            );
            let mut grouped = HashMap::new();
            for user in &users {
                let mut params = vec![SqlValue::from(user.id)];
                params.extend(type_params.iter().cloned());
                let rows = session.query(&sql, &params)?;
                grouped.extend(group_by_user(&rows)?);
            }
            grouped
        }
    };

    Ok(users
        .into_iter()
        .map(|user| {
            let contacts = grouped.remove(&user.id).unwrap_or_default();
            (user, contacts)
        })
        .collect())
}

/// `" <prefix> = <placeholder>"` plus its parameter, or nothing without a filter.
fn type_filter(
    dialect: Dialect,
    prefix: &str,
    index: usize,
    kind: Option<ContactType>,
) -> (String, Vec<SqlValue>) {
    match kind {
        Some(kind) => (
            format!(" {} = {}", prefix, dialect.placeholder(index)),
            vec![SqlValue::from(kind.as_str())],
        ),
        None => (String::new(), Vec::new()),
    }
}

/// Fold joined `(user..., contact...)` rows back into one entry per user.
fn collapse_joined(rows: &[Row]) -> Result<Vec<(User, Vec<Contact>)>> {
    let mut out: Vec<(User, Vec<Contact>)> = Vec::new();
    for row in rows {
        let user = user_from_row(row)?;
        if out.last().map(|(last, _)| last.id) != Some(user.id) {
            out.push((user, Vec::new()));
        }
        // Users without contacts come back with a NULL right side
        if row.get(3).is_some_and(|v| !v.is_null()) {
            let (_, contact) = contact_from_row(row, 3)?;
            if let Some((_, contacts)) = out.last_mut() {
                contacts.push(contact);
            }
        }
    }
    Ok(out)
}

// ==================== Fixture ====================

/// Companies, users and contacts the scenarios read from.
pub struct Directory {
    pub companies: Vec<Company>,
    pub users: Vec<User>,
    pub emails: Vec<Email>,
    pub phone_numbers: Vec<PhoneNumber>,
}

pub fn directory_fixture() -> Directory {
    let company = |id: i64, name: &str| Company {
        id,
        name: name.to_string(),
    };
    let user = |id: i64, name: &str, company_id: i64| User {
        id,
        name: name.to_string(),
        company_id: Some(company_id),
    };
    let email = |id: i64, kind: ContactType, email: &str, user_id: i64| Email {
        id,
        kind,
        email: email.to_string(),
        user_id,
    };
    let phone = |id: i64, kind: ContactType, number: &str, user_id: i64| PhoneNumber {
        id,
        kind,
        phone_number: number.to_string(),
        user_id,
    };

    Directory {
        companies: vec![company(1, "Zinc co."), company(2, "Cobalt co.")],
        users: vec![
            user(1, "Tommaso D'Odorico", 1),
            user(2, "Iain Brown", 2),
            user(3, "Peter Beckham", 1),
            user(4, "Gordon Coupar", 2),
            user(5, "David Gentles", 1),
        ],
        emails: vec![
            email(1, ContactType::Home, "tommaso.dodorico@gmail.com", 1),
            email(2, ContactType::Work, "tod@getadministrate.com", 1),
            email(3, ContactType::Work, "ib@getadministrate.com", 2),
            email(4, ContactType::Work, "pcb@getadministrate.com", 3),
            email(5, ContactType::Other, "gordon.coupar@example.com", 4),
        ],
        phone_numbers: vec![
            phone(1, ContactType::Home, "111 111 1111", 1),
            phone(2, ContactType::Work, "222 222 2222", 1),
            phone(3, ContactType::Work, "333 333 3333", 4),
            phone(4, ContactType::Work, "444 444 4444", 5),
            phone(5, ContactType::Home, "555 555 5555", 2),
        ],
    }
}

/// Insert the fixture unless users already exist. Returns whether it seeded.
pub fn seed_directory(session: &mut Session) -> Result<bool> {
    let existing = session.query_scalar("SELECT COUNT(*) FROM users", &[])?;
    if existing.and_then(|v| v.as_i64()).unwrap_or(0) > 0 {
        session.commit()?;
        return Ok(false);
    }

    let directory = directory_fixture();
    session.bulk_save_objects(&directory.companies)?;
    session.bulk_save_objects(&directory.users)?;
    session.bulk_save_objects(&directory.emails)?;
    session.bulk_save_objects(&directory.phone_numbers)?;
    session.commit()?;

    log::info!(
        "Seeded {} companies, {} users, {} emails, {} phone numbers",
        directory.companies.len(),
        directory.users.len(),
        directory.emails.len(),
        directory.phone_numbers.len()
    );
    Ok(true)
}

// ==================== Driver ====================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingRun {
    pub scenario: Scenario,
    pub strategy: LoadStrategy,
    pub results: serde_json::Value,
    pub queries: Vec<CapturedQuery>,
    pub elapsed_seconds: f64,
}

/// Run one scenario with every statement recorded.
pub fn run_loading_scenario(
    session: &mut Session,
    scenario: Scenario,
    strategy: LoadStrategy,
    phone_type: Option<ContactType>,
) -> Result<LoadingRun> {
    let mut recording = record_queries(session);
    let (results, measurement) = measure_time(|_| -> Result<serde_json::Value> {
        let value = match scenario {
            Scenario::Companies => {
                serde_json::to_value(get_user_companies(&mut recording, strategy)?)?
            }
            Scenario::Emails => serde_json::to_value(get_user_emails(&mut recording, strategy)?)?,
            Scenario::Phones => {
                serde_json::to_value(get_user_phones(&mut recording, strategy, phone_type)?)?
            }
        };
        Ok(value)
    });
    let queries = recording.finish();

    Ok(LoadingRun {
        scenario,
        strategy,
        results: results?,
        queries,
        elapsed_seconds: measurement.elapsed_seconds(),
    })
}

/// Parse arguments, open a session, seed the fixture and run the scenario.
pub fn execute_loading_scenario(
    scenario_name: &str,
    strategy_name: &str,
    phone_type: Option<&str>,
    settings: &HarnessSettings,
) -> Result<LoadingRun> {
    let scenario: Scenario = scenario_name.parse()?;
    let strategy: LoadStrategy = strategy_name.parse()?;
    let phone_type = phone_type.map(ContactType::from_str).transpose()?;

    let mut session = Session::open(&settings.database_url)?;
    schema::create_tables(&mut session)?;
    seed_directory(&mut session)?;

    let run = run_loading_scenario(&mut session, scenario, strategy, phone_type)?;
    session.close()?;
    Ok(run)
}
