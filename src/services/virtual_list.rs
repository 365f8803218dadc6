//! Windowing for long ranked lists.
//!
//! [`VirtualScrollManager`] keeps a cumulative position index over the item
//! heights (`pos[0] = 0`, `pos[i + 1] = pos[i] + height(i)`) and answers
//! "which items does this scroll offset need" with a binary search plus a
//! walk over the visible rows only.
//!
//! Heights come from, in order: a measured override recorded through
//! [`VirtualScrollManager::set_item_height`], the item's own height, or the
//! configured estimate. Overrides are keyed by item id so they survive a
//! new result list. The override map is capped and trimmed by insertion
//! order (oldest inserted goes first), not by access recency.
//!
//! Range results are memoized per scroll bucket (`floor(scroll_top /
//! bucket)`), so sub-bucket jitter reuses the previous answer as long as it
//! still covers the viewport.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::config::VirtualListConfig;

/// Height changes at or below this are treated as measurement noise.
pub const HEIGHT_EPSILON: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualItem<T> {
    pub id: String,
    pub payload: T,
    pub height: Option<f64>,
}

impl<T> VirtualItem<T> {
    pub fn new(id: impl Into<String>, payload: T) -> Self {
        Self {
            id: id.into(),
            payload,
            height: None,
        }
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }
}

/// The contiguous slice of items to materialize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleRange {
    pub scroll_top: f64,
    pub start_index: usize,
    /// Inclusive.
    pub end_index: usize,
    /// Top of the first materialized item.
    pub offset_y: f64,
}

impl VisibleRange {
    /// Number of items in the range.
    pub fn count(&self) -> usize {
        self.end_index - self.start_index + 1
    }
}

/// Absolute placement of one item inside the scroll content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemStyle {
    pub top: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleItem<'a, T> {
    pub item: &'a VirtualItem<T>,
    pub index: usize,
    pub style: ItemStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAlignment {
    Start,
    Center,
    End,
}

pub struct VirtualScrollManager<T> {
    items: Vec<VirtualItem<T>>,
    index_by_id: HashMap<String, usize>,
    positions: Vec<f64>,
    height_overrides: IndexMap<String, f64>,
    range_cache: IndexMap<i64, VisibleRange>,
    container_height: f64,
    config: VirtualListConfig,
}

impl<T> VirtualScrollManager<T> {
    pub fn new(config: &VirtualListConfig) -> Self {
        Self {
            items: Vec::new(),
            index_by_id: HashMap::new(),
            positions: vec![0.0],
            height_overrides: IndexMap::new(),
            range_cache: IndexMap::new(),
            container_height: config.container_height.max(0.0),
            config: config.clone(),
        }
    }

    /// Replace the whole item list.
    pub fn set_items(&mut self, items: Vec<VirtualItem<T>>) {
        self.index_by_id = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.id.clone(), i))
            .collect();
        self.items = items;
        self.rebuild_positions();
    }

    pub fn items(&self) -> &[VirtualItem<T>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    /// The cumulative position index, `len() + 1` long.
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn total_height(&self) -> f64 {
        self.positions.last().copied().unwrap_or(0.0)
    }

    pub fn container_height(&self) -> f64 {
        self.container_height
    }

    pub fn set_container_height(&mut self, height: f64) {
        let height = height.max(0.0);
        if height != self.container_height {
            self.container_height = height;
            self.range_cache.clear();
        }
    }

    pub fn height_override(&self, id: &str) -> Option<f64> {
        self.height_overrides.get(id).copied()
    }

    pub fn height_override_count(&self) -> usize {
        self.height_overrides.len()
    }

    fn height_for(&self, item: &VirtualItem<T>) -> f64 {
        self.height_overrides
            .get(&item.id)
            .copied()
            .or(item.height)
            .unwrap_or(self.config.estimated_item_height)
            .max(0.0)
    }

    pub fn item_height(&self, index: usize) -> Option<f64> {
        self.items.get(index).map(|item| self.height_for(item))
    }

    /// Record a measured height for `id`.
    ///
    /// Returns `true` when the change exceeded [`HEIGHT_EPSILON`] and the
    /// position index was rebuilt; smaller changes are ignored entirely.
    pub fn set_item_height(&mut self, id: &str, height: f64) -> bool {
        let height = height.max(0.0);
        let current = match self.index_of(id) {
            Some(index) => self.height_for(&self.items[index]),
            None => self
                .height_overrides
                .get(id)
                .copied()
                .unwrap_or(self.config.estimated_item_height),
        };
        if (height - current).abs() <= HEIGHT_EPSILON {
            return false;
        }

        // Re-inserting moves the id to the newest position.
        self.height_overrides.shift_remove(id);
        self.height_overrides.insert(id.to_string(), height);

        let max = self.config.max_height_overrides.max(1);
        if self.height_overrides.len() > max {
            let excess = self.height_overrides.len() - max;
            self.height_overrides.drain(..excess);
        }

        self.rebuild_positions();
        true
    }

    fn rebuild_positions(&mut self) {
        let mut positions = Vec::with_capacity(self.items.len() + 1);
        let mut top = 0.0;
        positions.push(top);
        for item in &self.items {
            top += self.height_for(item);
            positions.push(top);
        }
        self.positions = positions;
        self.range_cache.clear();
        debug!(items = self.items.len(), total_height = top, "rebuilt position index");
    }

    /// Index of the item covering `offset`, clamped to the list.
    pub fn index_at_offset(&self, offset: f64) -> Option<usize> {
        if self.items.is_empty() {
            return None;
        }
        // Items whose bottom edge is at or before `offset` lie fully above it.
        let passed = self.positions[1..].partition_point(|&bottom| bottom <= offset);
        Some(passed.min(self.items.len() - 1))
    }

    fn bucket(&self, scroll_top: f64) -> i64 {
        (scroll_top / self.config.scroll_bucket.max(1.0)).floor() as i64
    }

    /// Items to materialize for `scroll_top`, `None` for an empty list.
    pub fn get_visible_range(&mut self, scroll_top: f64) -> Option<VisibleRange> {
        let key = self.bucket(scroll_top);
        if let Some(range) = self.range_cache.get(&key) {
            if self.covers(range, scroll_top) {
                return Some(*range);
            }
        }

        let range = self.compute_range(scroll_top)?;

        if !self.range_cache.contains_key(&key) {
            let max = self.config.range_cache_size.max(1);
            while self.range_cache.len() >= max {
                self.range_cache.shift_remove_index(0);
            }
        }
        self.range_cache.insert(key, range);

        Some(range)
    }

    /// Whether `range` materializes every row intersecting the viewport at
    /// `scroll_top`.
    fn covers(&self, range: &VisibleRange, scroll_top: f64) -> bool {
        let last_index = self.items.len().saturating_sub(1);
        if range.end_index > last_index {
            return false;
        }
        let reaches_top = self.positions[range.start_index] <= scroll_top.max(0.0);
        let reaches_bottom = range.end_index == last_index
            || self.positions[range.end_index + 1] >= scroll_top + self.container_height;
        reaches_top && reaches_bottom
    }

    fn compute_range(&self, scroll_top: f64) -> Option<VisibleRange> {
        let first = self.index_at_offset(scroll_top)?;
        let last_index = self.items.len() - 1;
        let overscan = self.config.overscan;

        let start_index = first.saturating_sub(overscan);
        let bottom = scroll_top + self.container_height;

        let mut raw_end = first;
        for index in start_index..=last_index {
            if index > first && self.positions[index] > bottom {
                break;
            }
            raw_end = index;
        }
        let end_index = (raw_end + overscan).min(last_index);

        Some(VisibleRange {
            scroll_top,
            start_index,
            end_index,
            offset_y: self.positions[start_index],
        })
    }

    /// The items of [`get_visible_range`](Self::get_visible_range) with
    /// their placement.
    pub fn get_visible_items(&mut self, scroll_top: f64) -> Vec<VisibleItem<'_, T>> {
        let Some(range) = self.get_visible_range(scroll_top) else {
            return Vec::new();
        };

        (range.start_index..=range.end_index)
            .map(|index| VisibleItem {
                item: &self.items[index],
                index,
                style: ItemStyle {
                    top: self.positions[index],
                    height: self.positions[index + 1] - self.positions[index],
                },
            })
            .collect()
    }

    /// Scroll offset that brings `id` into view with `alignment`, clamped to
    /// the scrollable extent.
    pub fn scroll_to_item(&self, id: &str, alignment: ScrollAlignment) -> Option<f64> {
        let index = self.index_of(id)?;
        let top = self.positions[index];
        let height = self.positions[index + 1] - top;
        let viewport = self.container_height;

        let target = match alignment {
            ScrollAlignment::Start => top,
            ScrollAlignment::Center => top + height / 2.0 - viewport / 2.0,
            ScrollAlignment::End => top + height - viewport,
        };

        let max_scroll = (self.total_height() - viewport).max(0.0);
        Some(target.clamp(0.0, max_scroll))
    }
}
