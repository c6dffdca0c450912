//! Channel Registry
//!
//! Owns channels, their style defaults and the membership list of content
//! items. Item data itself lives in the [`ItemStore`].

use crate::error::AppError;
use crate::pipeline::item::{ContentItem, ItemDefaults, ProgressBucket};
use crate::pipeline::store::ItemStore;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

/// A named content source with default style settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: Uuid,
    pub name: String,
    pub niche: String,
    pub persona: String,
    pub locale: String,
    pub tone: String,
    pub forbidden_terms: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Owned items, in insertion order
    pub item_ids: Vec<Uuid>,
}

impl Channel {
    /// Defaults that seed a new item
    pub fn item_defaults(&self) -> ItemDefaults {
        ItemDefaults {
            niche: self.niche.clone(),
            persona: self.persona.clone(),
            tone: self.tone.clone(),
            forbidden_terms: self.forbidden_terms.clone(),
        }
    }

    pub fn owns(&self, item_id: Uuid) -> bool {
        self.item_ids.contains(&item_id)
    }
}

/// Input for creating a channel
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChannel {
    pub name: String,
    #[serde(default)]
    pub niche: String,
    #[serde(default)]
    pub persona: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub forbidden_terms: Vec<String>,
}

impl NewChannel {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Partial update of channel defaults; `None` leaves a field alone
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelUpdate {
    pub name: Option<String>,
    pub niche: Option<String>,
    pub persona: Option<String>,
    pub locale: Option<String>,
    pub tone: Option<String>,
    pub forbidden_terms: Option<Vec<String>>,
}

/// Per-channel rollup, one count per bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressCounts {
    pub published: usize,
    pub rendered: usize,
    pub narrated: usize,
    pub thumbnailed: usize,
    pub scripted: usize,
    pub created_only: usize,
    pub total: usize,
    pub complete: usize,
}

impl ProgressCounts {
    pub fn tally<'a>(items: impl IntoIterator<Item = &'a ContentItem>) -> Self {
        let mut counts = Self::default();
        for item in items {
            counts.record(item);
        }
        counts
    }

    fn record(&mut self, item: &ContentItem) {
        let slot = match item.bucket() {
            ProgressBucket::Published => &mut self.published,
            ProgressBucket::Rendered => &mut self.rendered,
            ProgressBucket::Narrated => &mut self.narrated,
            ProgressBucket::Thumbnailed => &mut self.thumbnailed,
            ProgressBucket::Scripted => &mut self.scripted,
            ProgressBucket::CreatedOnly => &mut self.created_only,
        };
        *slot += 1;
        self.total += 1;
        if item.is_complete() {
            self.complete += 1;
        }
    }

    pub fn count(&self, bucket: ProgressBucket) -> usize {
        match bucket {
            ProgressBucket::Published => self.published,
            ProgressBucket::Rendered => self.rendered,
            ProgressBucket::Narrated => self.narrated,
            ProgressBucket::Thumbnailed => self.thumbnailed,
            ProgressBucket::Scripted => self.scripted,
            ProgressBucket::CreatedOnly => self.created_only,
        }
    }
}

fn require_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput(
            "Channel name must not be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn clean_terms(terms: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(terms.len());
    for term in terms {
        let term = term.trim().to_string();
        if !term.is_empty() && !cleaned.contains(&term) {
            cleaned.push(term);
        }
    }
    cleaned
}

/// Thread-safe channel registry
pub struct ChannelRegistry {
    channels: RwLock<HashMap<Uuid, Channel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub fn create_channel(&self, input: NewChannel) -> Result<Channel, AppError> {
        let name = require_name(&input.name)?;
        let now = Utc::now();
        let channel = Channel {
            id: Uuid::new_v4(),
            name,
            niche: input.niche.trim().to_string(),
            persona: input.persona.trim().to_string(),
            locale: input.locale.trim().to_string(),
            tone: input.tone.trim().to_string(),
            forbidden_terms: clean_terms(input.forbidden_terms),
            created_at: now,
            updated_at: now,
            item_ids: Vec::new(),
        };

        self.channels.write().insert(channel.id, channel.clone());
        info!("Created channel '{}' (id: {})", channel.name, channel.id);
        Ok(channel)
    }

    /// Insert a channel as-is, replacing any channel with the same id
    pub fn restore(&self, channel: Channel) {
        self.channels.write().insert(channel.id, channel);
    }

    pub fn get_channel(&self, channel_id: Uuid) -> Result<Channel, AppError> {
        self.channels
            .read()
            .get(&channel_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Channel {} not found", channel_id)))
    }

    pub fn contains(&self, channel_id: Uuid) -> bool {
        self.channels.read().contains_key(&channel_id)
    }

    /// All channels, oldest first
    pub fn list_channels(&self) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self.channels.read().values().cloned().collect();
        channels.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        channels
    }

    /// Update channel metadata in place. Existing items keep the defaults
    /// they were created with.
    pub fn update_channel_defaults(
        &self,
        channel_id: Uuid,
        update: ChannelUpdate,
    ) -> Result<Channel, AppError> {
        let name = update.name.as_deref().map(require_name).transpose()?;

        let mut channels = self.channels.write();
        let channel = channels
            .get_mut(&channel_id)
            .ok_or_else(|| AppError::NotFound(format!("Channel {} not found", channel_id)))?;

        if let Some(name) = name {
            channel.name = name;
        }
        if let Some(niche) = update.niche {
            channel.niche = niche.trim().to_string();
        }
        if let Some(persona) = update.persona {
            channel.persona = persona.trim().to_string();
        }
        if let Some(locale) = update.locale {
            channel.locale = locale.trim().to_string();
        }
        if let Some(tone) = update.tone {
            channel.tone = tone.trim().to_string();
        }
        if let Some(terms) = update.forbidden_terms {
            channel.forbidden_terms = clean_terms(terms);
        }
        channel.updated_at = Utc::now();
        Ok(channel.clone())
    }

    pub fn add_item(&self, channel_id: Uuid, item_id: Uuid) -> Result<(), AppError> {
        self.add_items(channel_id, &[item_id])
    }

    /// Add several items at once; either all are added or none
    pub fn add_items(&self, channel_id: Uuid, item_ids: &[Uuid]) -> Result<(), AppError> {
        let mut channels = self.channels.write();
        let channel = channels
            .get_mut(&channel_id)
            .ok_or_else(|| AppError::NotFound(format!("Channel {} not found", channel_id)))?;

        if let Some(existing) = item_ids.iter().find(|id| channel.owns(**id)) {
            return Err(AppError::Conflict(format!(
                "Item {} already belongs to channel {}",
                existing, channel_id
            )));
        }
        channel.item_ids.extend_from_slice(item_ids);
        channel.updated_at = Utc::now();
        Ok(())
    }

    pub fn remove_item(&self, channel_id: Uuid, item_id: Uuid) -> Result<(), AppError> {
        let mut channels = self.channels.write();
        let channel = channels
            .get_mut(&channel_id)
            .ok_or_else(|| AppError::NotFound(format!("Channel {} not found", channel_id)))?;

        let position = channel
            .item_ids
            .iter()
            .position(|id| *id == item_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Item {} does not belong to channel {}",
                    item_id, channel_id
                ))
            })?;
        channel.item_ids.remove(position);
        channel.updated_at = Utc::now();
        Ok(())
    }

    /// Remove a channel, returning the ids of the items it owned
    pub fn delete_channel(&self, channel_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let channel = self
            .channels
            .write()
            .remove(&channel_id)
            .ok_or_else(|| AppError::NotFound(format!("Channel {} not found", channel_id)))?;
        info!("Deleted channel '{}' (id: {})", channel.name, channel.id);
        Ok(channel.item_ids)
    }

    pub fn item_ids(&self, channel_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(self.get_channel(channel_id)?.item_ids)
    }

    /// Classify every owned item into exactly one bucket
    pub fn aggregate_progress(
        &self,
        channel_id: Uuid,
        store: &ItemStore,
    ) -> Result<ProgressCounts, AppError> {
        let ids = self.item_ids(channel_id)?;
        let items = store.get_many(&ids);
        Ok(ProgressCounts::tally(&items))
    }

    pub fn clear(&self) {
        self.channels.write().clear();
    }

    pub fn count(&self) -> usize {
        self.channels.read().len()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
