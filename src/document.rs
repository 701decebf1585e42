//! The export document model.
//!
//! All collections are optional, and so are the sub-fields the aggregation
//! engine relies on. Shape problems inside a record surface later, from the
//! accessor that needs the field, rather than failing the whole load.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LoadError;
use crate::timestamp::RawTimestamp;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_user: Option<Vec<ProfileEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_list: Option<Vec<MediaItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stories: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_messages: Option<Vec<MessageThread>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_messages: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<Vec<Connection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following: Option<Vec<Connection>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileEntry {
    #[serde(default)]
    pub string_map_data: Option<HashMap<String, MapValue>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub timestamp: Option<RawTimestamp>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageThread {
    #[serde(default)]
    pub conversation: Option<Vec<Message>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub timestamp: Option<RawTimestamp>,
}

/// One follower or followed account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default)]
    pub string_list_data: Option<Vec<ConnectionValue>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionValue {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub timestamp: Option<RawTimestamp>,
}

impl ExportDocument {
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    /// The `string_map_data` entry at `key` of the first profile record.
    pub fn profile_value(&self, key: &str) -> Option<&Value> {
        self.profile_user
            .as_ref()?
            .first()?
            .string_map_data
            .as_ref()?
            .get(key)?
            .value
            .as_ref()
    }

    pub fn connections(&self, relation: Relation) -> &[Connection] {
        let list = match relation {
            Relation::Followers => &self.followers,
            Relation::Following => &self.following,
        };
        list.as_deref().unwrap_or_default()
    }

    pub fn media(&self) -> &[MediaItem] {
        self.media_list.as_deref().unwrap_or_default()
    }

    pub fn threads(&self) -> &[MessageThread] {
        self.direct_messages.as_deref().unwrap_or_default()
    }
}

/// Top-level sequences that can be counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Media,
    Stories,
    Likes,
    Comments,
    DirectMessages,
    GroupMessages,
    Followers,
    Following,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Media,
        Collection::Stories,
        Collection::Likes,
        Collection::Comments,
        Collection::DirectMessages,
        Collection::GroupMessages,
        Collection::Followers,
        Collection::Following,
    ];

    /// The JSON key of the collection.
    pub fn key(self) -> &'static str {
        match self {
            Collection::Media => "media_list",
            Collection::Stories => "stories",
            Collection::Likes => "likes",
            Collection::Comments => "comments",
            Collection::DirectMessages => "direct_messages",
            Collection::GroupMessages => "group_messages",
            Collection::Followers => "followers",
            Collection::Following => "following",
        }
    }

    /// Length of the collection, if present.
    pub fn len_in(self, doc: &ExportDocument) -> Option<usize> {
        match self {
            Collection::Media => doc.media_list.as_ref().map(Vec::len),
            Collection::Stories => doc.stories.as_ref().map(Vec::len),
            Collection::Likes => doc.likes.as_ref().map(Vec::len),
            Collection::Comments => doc.comments.as_ref().map(Vec::len),
            Collection::DirectMessages => doc.direct_messages.as_ref().map(Vec::len),
            Collection::GroupMessages => doc.group_messages.as_ref().map(Vec::len),
            Collection::Followers => doc.followers.as_ref().map(Vec::len),
            Collection::Following => doc.following.as_ref().map(Vec::len),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Collection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Collection::ALL
            .into_iter()
            .find(|c| c.key() == s)
            .or(match s {
                "media" => Some(Collection::Media),
                _ => None,
            })
            .ok_or_else(|| anyhow!("unknown collection `{}`", s))
    }
}

/// The two connection lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Followers,
    Following,
}

impl Relation {
    pub fn collection(self) -> Collection {
        match self {
            Relation::Followers => Collection::Followers,
            Relation::Following => Collection::Following,
        }
    }
}
