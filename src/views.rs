//! Pure derivations over loaded lists: tag counts, tag filters and checkbox
//! selection. Every operation returns a new value.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::models::{Question, Tag};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TagCount {
    pub tag_id: String,
    pub name: String,
    pub count: usize,
}

/// Number of questions carrying each tag. Every tag is listed, most used
/// first; a question counts once per distinct tag.
pub fn tag_counts(tags: &[Tag], questions: &[Question]) -> Vec<TagCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for question in questions {
        let distinct: BTreeSet<&str> = question.tag_ids.iter().map(String::as_str).collect();
        for tag_id in distinct {
            *counts.entry(tag_id).or_default() += 1;
        }
    }

    let mut result: Vec<TagCount> = tags
        .iter()
        .map(|tag| TagCount {
            tag_id: tag.id.clone(),
            name: tag.name.clone(),
            count: counts.get(tag.id.as_str()).copied().unwrap_or(0),
        })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    result
}

/// Questions carrying every selected tag. No selection keeps everything.
pub fn filter_by_tags<'a>(questions: &'a [Question], selected: &BTreeSet<String>) -> Vec<&'a Question> {
    questions
        .iter()
        .filter(|q| selected.iter().all(|tag| q.tag_ids.contains(tag)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    Unchecked,
    Indeterminate,
    Checked,
}

/// Selected ids in the order they were picked, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<String>,
}

impl Selection {
    pub fn from_ids<I: IntoIterator<Item = String>>(ids: I) -> Self {
        let mut selection = Self::default();
        for id in ids {
            if !selection.ids.contains(&id) {
                selection.ids.push(id);
            }
        }
        selection
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|selected| selected == id)
    }

    pub fn with_toggled(&self, id: &str) -> Self {
        if self.contains(id) {
            Self {
                ids: self.ids.iter().filter(|s| *s != id).cloned().collect(),
            }
        } else {
            let mut ids = self.ids.clone();
            ids.push(id.to_string());
            Self { ids }
        }
    }

    /// Header checkbox: selects every visible id, or clears them.
    pub fn with_all(&self, visible: &[String], selected: bool) -> Self {
        if selected {
            Self::from_ids(self.ids.iter().chain(visible.iter()).cloned())
        } else {
            Self {
                ids: self.ids.iter().filter(|id| !visible.contains(id)).cloned().collect(),
            }
        }
    }

    /// Drops ids that are no longer in the list.
    pub fn retain_visible(&self, visible: &[String]) -> Self {
        Self {
            ids: self.ids.iter().filter(|id| visible.contains(id)).cloned().collect(),
        }
    }

    pub fn state(&self, visible: &[String]) -> CheckState {
        let selected = visible.iter().filter(|id| self.contains(id)).count();
        if selected == 0 {
            CheckState::Unchecked
        } else if selected == visible.len() {
            CheckState::Checked
        } else {
            CheckState::Indeterminate
        }
    }
}
