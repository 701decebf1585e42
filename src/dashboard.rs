//! Tab-by-tab view model of the dashboard.
//!
//! A [`TabView`] is plain data: panels of labelled values, name lists and
//! rankings, already formatted. Renderers only lay it out.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::Serialize;

use crate::config::DashboardConfig;
use crate::document::{Collection, ExportDocument, Relation};
use crate::error::DocumentError;
use crate::stats::{self, ContactCount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    Overview,
    Media,
    Engagement,
    Followers,
    Following,
    Contacts,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Overview,
        Tab::Media,
        Tab::Engagement,
        Tab::Followers,
        Tab::Following,
        Tab::Contacts,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Tab::Overview => "overview",
            Tab::Media => "media",
            Tab::Engagement => "engagement",
            Tab::Followers => "followers",
            Tab::Following => "following",
            Tab::Contacts => "contacts",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Media => "Media",
            Tab::Engagement => "Engagement",
            Tab::Followers => "Followers",
            Tab::Following => "Following",
            Tab::Contacts => "Top Contacts",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Tab {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Tab::ALL
            .into_iter()
            .find(|t| t.id() == wanted)
            .ok_or_else(|| {
                let ids: Vec<&str> = Tab::ALL.iter().map(|t| t.id()).collect();
                anyhow!("unknown tab `{}` (expected one of {})", s, ids.join(", "))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stat {
    pub label: String,
    pub value: String,
}

impl Stat {
    fn new(label: &str, value: impl ToString) -> Self {
        Self { label: label.to_string(), value: value.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Panel {
    Card { title: String, stats: Vec<Stat> },
    List { title: String, items: Vec<String> },
    Ranking { title: String, entries: Vec<ContactCount> },
}

impl Panel {
    fn card(title: &str, stats: Vec<Stat>) -> Self {
        Panel::Card { title: title.to_string(), stats }
    }

    pub fn title(&self) -> &str {
        match self {
            Panel::Card { title, .. } | Panel::List { title, .. } | Panel::Ranking { title, .. } => title,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabView {
    pub tab: Tab,
    pub title: String,
    /// `@username`
    pub header: String,
    pub panels: Vec<Panel>,
}

pub fn render_tab(
    doc: &ExportDocument,
    tab: Tab,
    config: &DashboardConfig,
) -> Result<TabView, DocumentError> {
    let panels = match tab {
        Tab::Overview => overview(doc),
        Tab::Media => media(doc, config),
        Tab::Engagement => engagement(doc),
        Tab::Followers => followers(doc, config)?,
        Tab::Following => following(doc, config)?,
        Tab::Contacts => contacts(doc, config)?,
    };
    Ok(TabView {
        tab,
        title: tab.label().to_string(),
        header: format!("@{}", stats::profile_username(doc)),
        panels,
    })
}

pub fn render_all(doc: &ExportDocument, config: &DashboardConfig) -> Result<Vec<TabView>, DocumentError> {
    Tab::ALL.into_iter().map(|t| render_tab(doc, t, config)).collect()
}

fn overview(doc: &ExportDocument) -> Vec<Panel> {
    let media = stats::total_count(doc, Collection::Media);
    vec![
        Panel::card(
            "Profile Info",
            vec![
                Stat::new("Username", stats::profile_username(doc)),
                Stat::new("Joined", stats::profile_join_date(doc)),
            ],
        ),
        Panel::card(
            "Activity Overview",
            vec![
                Stat::new("Total Posts", media),
                Stat::new("Stories", stats::total_count(doc, Collection::Stories)),
            ],
        ),
        Panel::card(
            "Account Stats",
            vec![
                Stat::new("Media Items", media),
                Stat::new("Active Days", stats::active_days(doc)),
            ],
        ),
    ]
}

fn media(doc: &ExportDocument, config: &DashboardConfig) -> Vec<Panel> {
    let configured = config
        .media_types
        .iter()
        .map(|t| Stat::new(&t.label, stats::media_count_by_type(doc, &t.media_type)))
        .collect();
    let breakdown = stats::media_type_breakdown(doc)
        .into_iter()
        .map(|t| Stat::new(&t.media_type, t.count))
        .collect();
    vec![
        Panel::card("Media Distribution", configured),
        Panel::card("All Media Types", breakdown),
    ]
}

fn engagement(doc: &ExportDocument) -> Vec<Panel> {
    vec![
        Panel::card(
            "Engagement",
            vec![
                Stat::new("Likes Given", stats::total_count(doc, Collection::Likes)),
                Stat::new("Comments Made", stats::total_count(doc, Collection::Comments)),
            ],
        ),
        Panel::card(
            "Communication",
            vec![
                Stat::new("Direct Messages", stats::total_count(doc, Collection::DirectMessages)),
                Stat::new("Group Messages", stats::total_count(doc, Collection::GroupMessages)),
            ],
        ),
        Panel::card(
            "Activity Patterns",
            vec![
                Stat::new("Most Active Hour", stats::most_active_hour(doc)),
                Stat::new("Most Active Day", stats::most_active_day(doc)),
            ],
        ),
    ]
}

fn followers(doc: &ExportDocument, config: &DashboardConfig) -> Result<Vec<Panel>, DocumentError> {
    let growth = match stats::growth_rate(doc) {
        Some(rate) => format!("{rate:.2}/day"),
        None => "N/A".to_string(),
    };
    Ok(vec![
        Panel::card(
            "Followers Overview",
            vec![
                Stat::new("Total Followers", stats::total_count(doc, Collection::Followers)),
                Stat::new("Average Growth", growth),
            ],
        ),
        Panel::List {
            title: "Recent Followers".to_string(),
            items: stats::recent_identities(doc, Relation::Followers, config.recent_limit)?,
        },
    ])
}

fn following(doc: &ExportDocument, config: &DashboardConfig) -> Result<Vec<Panel>, DocumentError> {
    Ok(vec![
        Panel::card(
            "Following Overview",
            vec![
                Stat::new("Total Following", stats::total_count(doc, Collection::Following)),
                Stat::new("Following Ratio", format!("{:.2}", stats::follow_ratio(doc))),
            ],
        ),
        Panel::List {
            title: "Recently Followed".to_string(),
            items: stats::recent_identities(doc, Relation::Following, config.recent_limit)?,
        },
    ])
}

fn contacts(doc: &ExportDocument, config: &DashboardConfig) -> Result<Vec<Panel>, DocumentError> {
    Ok(vec![Panel::Ranking {
        title: "Top Contacts".to_string(),
        entries: stats::top_contacts(doc, config.top_contacts_limit)?,
    }])
}
