//! Aggregations over an [`ExportDocument`].
//!
//! Every function is a single pass over the collections it reads and keeps no
//! state between calls. Missing collections count as empty. Only a record that
//! lacks a field the statistic cannot do without produces a [`DocumentError`].

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Datelike, Local, NaiveDate, TimeZone, Timelike};
use serde::Serialize;
use serde_json::Value;

use crate::document::{Collection, ExportDocument, Relation};
use crate::error::DocumentError;
use crate::timestamp::{self, format_long_date, Moment, RawTimestamp};

pub const UNKNOWN_USERNAME: &str = "N/A";
pub const INVALID_DATE: &str = "Invalid Date";

const USERNAME_KEY: &str = "username";
const JOINED_DATE_KEY: &str = "joined_date";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactCount {
    pub sender: String,
    pub messages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    pub media_type: String,
    pub count: usize,
}

/// The owner's username, or `"N/A"`.
pub fn profile_username(doc: &ExportDocument) -> &str {
    owner_username(doc).unwrap_or(UNKNOWN_USERNAME)
}

fn owner_username(doc: &ExportDocument) -> Option<&str> {
    doc.profile_value(USERNAME_KEY)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

pub fn profile_join_date(doc: &ExportDocument) -> String {
    profile_join_date_in(doc, &Local)
}

/// The join date as `January 5, 2020` in `tz`, or `"Invalid Date"`.
pub fn profile_join_date_in<Tz: TimeZone>(doc: &ExportDocument, tz: &Tz) -> String {
    doc.profile_value(JOINED_DATE_KEY)
        .and_then(json_moment)
        .map(|m| format_long_date(m.date_in(tz)))
        .unwrap_or_else(|| INVALID_DATE.to_string())
}

fn json_moment(value: &Value) -> Option<Moment> {
    match value {
        Value::String(s) => timestamp::parse_text(s),
        Value::Number(n) => match n.as_i64() {
            Some(v) => RawTimestamp::Integer(v).parse(),
            None => n.as_f64().and_then(|v| RawTimestamp::Float(v).parse()),
        },
        _ => None,
    }
}

pub fn total_count(doc: &ExportDocument, collection: Collection) -> usize {
    collection.len_in(doc).unwrap_or(0)
}

/// Exact, case-sensitive match on `media_type`.
pub fn media_count_by_type(doc: &ExportDocument, media_type: &str) -> usize {
    doc.media()
        .iter()
        .filter(|m| m.media_type.as_deref() == Some(media_type))
        .count()
}

/// Count per media type, in the order each type first appears. Items without a
/// type are left out.
pub fn media_type_breakdown(doc: &ExportDocument) -> Vec<TypeCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<TypeCount> = Vec::new();
    for kind in doc.media().iter().filter_map(|m| m.media_type.as_deref()) {
        match index.get(kind) {
            Some(&i) => out[i].count += 1,
            None => {
                index.insert(kind, out.len());
                out.push(TypeCount { media_type: kind.to_string(), count: 1 });
            }
        }
    }
    out
}

fn media_moments(doc: &ExportDocument) -> impl Iterator<Item = Moment> + '_ {
    doc.media()
        .iter()
        .filter_map(|m| m.timestamp.as_ref()?.parse())
}

pub fn active_days(doc: &ExportDocument) -> usize {
    active_days_in(doc, &Local)
}

/// Distinct calendar dates in `tz` among media timestamps. Unparseable
/// timestamps are skipped.
pub fn active_days_in<Tz: TimeZone>(doc: &ExportDocument, tz: &Tz) -> usize {
    media_moments(doc)
        .map(|m| m.date_in(tz))
        .collect::<HashSet<NaiveDate>>()
        .len()
}

pub fn daily_media_counts(doc: &ExportDocument) -> BTreeMap<NaiveDate, usize> {
    daily_media_counts_in(doc, &Local)
}

pub fn daily_media_counts_in<Tz: TimeZone>(doc: &ExportDocument, tz: &Tz) -> BTreeMap<NaiveDate, usize> {
    let mut days = BTreeMap::new();
    for m in media_moments(doc) {
        *days.entry(m.date_in(tz)).or_insert(0) += 1;
    }
    days
}

pub fn daily_connection_counts(doc: &ExportDocument, relation: Relation) -> BTreeMap<NaiveDate, usize> {
    daily_connection_counts_in(doc, relation, &Local)
}

/// New followers (or followed accounts) per calendar date in `tz`, keyed on
/// the timestamp of each connection's first entry. Connections without one
/// are skipped.
pub fn daily_connection_counts_in<Tz: TimeZone>(
    doc: &ExportDocument,
    relation: Relation,
    tz: &Tz,
) -> BTreeMap<NaiveDate, usize> {
    let mut days = BTreeMap::new();
    let moments = doc.connections(relation).iter().filter_map(|c| {
        c.string_list_data.as_deref()?.first()?.timestamp.as_ref()?.parse()
    });
    for m in moments {
        *days.entry(m.date_in(tz)).or_insert(0) += 1;
    }
    days
}

pub fn growth_rate(doc: &ExportDocument) -> Option<f64> {
    growth_rate_in(doc, &Local)
}

/// Followers per active day. `None` when there are no active days.
pub fn growth_rate_in<Tz: TimeZone>(doc: &ExportDocument, tz: &Tz) -> Option<f64> {
    let days = active_days_in(doc, tz);
    (days > 0).then(|| total_count(doc, Collection::Followers) as f64 / days as f64)
}

/// Followers over following, with the denominator floored at one.
pub fn follow_ratio(doc: &ExportDocument) -> f64 {
    let followers = total_count(doc, Collection::Followers);
    let following = total_count(doc, Collection::Following).max(1);
    followers as f64 / following as f64
}

/// The first `n` identities of a connection list, in export order.
pub fn recent_identities(
    doc: &ExportDocument,
    relation: Relation,
    n: usize,
) -> Result<Vec<String>, DocumentError> {
    let collection = relation.collection().key();
    doc.connections(relation)
        .iter()
        .take(n)
        .enumerate()
        .map(|(index, c)| {
            c.string_list_data
                .as_deref()
                .and_then(<[_]>::first)
                .and_then(|v| v.value.clone())
                .ok_or(DocumentError::MissingField {
                    collection,
                    index,
                    field: "string_list_data[0].value",
                })
        })
        .collect()
}

/// Senders ranked by message count across all direct-message threads, the
/// owner excluded. Ties keep first-seen order.
pub fn top_contacts(doc: &ExportDocument, n: usize) -> Result<Vec<ContactCount>, DocumentError> {
    let owner = owner_username(doc);
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut tally: Vec<ContactCount> = Vec::new();

    for (t, thread) in doc.threads().iter().enumerate() {
        let conversation = thread.conversation.as_deref().ok_or(DocumentError::MissingField {
            collection: Collection::DirectMessages.key(),
            index: t,
            field: "conversation",
        })?;
        for (m, msg) in conversation.iter().enumerate() {
            let sender = msg.sender.as_deref().ok_or(DocumentError::MissingSender {
                collection: Collection::DirectMessages.key(),
                index: t,
                message: m,
            })?;
            if Some(sender) == owner {
                continue;
            }
            match index.get(sender) {
                Some(&i) => tally[i].messages += 1,
                None => {
                    index.insert(sender, tally.len());
                    tally.push(ContactCount { sender: sender.to_string(), messages: 1 });
                }
            }
        }
    }

    // sort_by is stable, so equal counts stay in insertion order
    tally.sort_by(|a, b| b.messages.cmp(&a.messages));
    tally.truncate(n);
    Ok(tally)
}

/// Always `"3 PM"`; the dashboard has never computed this.
pub fn most_active_hour(_doc: &ExportDocument) -> &'static str {
    "3 PM"
}

/// Always `"Saturday"`; see [`most_active_hour`].
pub fn most_active_day(_doc: &ExportDocument) -> &'static str {
    "Saturday"
}

/// Media and direct-message timestamps. Messages without a usable timestamp are skipped.
fn activity_moments(doc: &ExportDocument) -> impl Iterator<Item = Moment> + '_ {
    let messages = doc
        .threads()
        .iter()
        .filter_map(|t| t.conversation.as_deref())
        .flatten()
        .filter_map(|msg| msg.timestamp.as_ref()?.parse());
    media_moments(doc).chain(messages)
}

pub fn hourly_activity(doc: &ExportDocument) -> [usize; 24] {
    hourly_activity_in(doc, &Local)
}

pub fn hourly_activity_in<Tz: TimeZone>(doc: &ExportDocument, tz: &Tz) -> [usize; 24] {
    let mut hours = [0; 24];
    for m in activity_moments(doc) {
        hours[m.wall_clock_in(tz).hour() as usize] += 1;
    }
    hours
}

pub fn weekday_activity(doc: &ExportDocument) -> [usize; 7] {
    weekday_activity_in(doc, &Local)
}

/// Monday first.
pub fn weekday_activity_in<Tz: TimeZone>(doc: &ExportDocument, tz: &Tz) -> [usize; 7] {
    let mut days = [0; 7];
    for m in activity_moments(doc) {
        days[m.date_in(tz).weekday().num_days_from_monday() as usize] += 1;
    }
    days
}
