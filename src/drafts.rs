//! Local, backend-less content drafts

use rand::Rng;
use thiserror::Error;

use crate::models::Tier;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 9;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("Video name is required")]
    MissingName,
    #[error("Video URL is required")]
    MissingUrl,
    #[error("{0} cannot hold local drafts")]
    UnrankedTier(&'static str),
}

/// Form fields of the creation panel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftForm {
    pub name: String,
    pub url: String,
    pub tier: Tier,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalContent {
    pub id: String,
    pub name: String,
    pub url: String,
    pub tier: Tier,
}

#[derive(Debug, Default)]
pub struct DraftBook {
    items: Vec<LocalContent>,
}

impl DraftBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append the form, then reset it
    pub fn add(&mut self, form: &mut DraftForm) -> Result<&LocalContent, DraftError> {
        let name = form.name.trim();
        let url = form.url.trim();
        if name.is_empty() {
            return Err(DraftError::MissingName);
        }
        if url.is_empty() {
            return Err(DraftError::MissingUrl);
        }
        if !form.tier.is_ranked() {
            return Err(DraftError::UnrankedTier(form.tier.label()));
        }

        self.items.push(LocalContent {
            id: random_id(),
            name: name.to_string(),
            url: url.to_string(),
            tier: form.tier,
        });
        *form = DraftForm::default();
        Ok(&self.items[self.items.len() - 1])
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|c| c.id != id);
        self.items.len() != before
    }

    pub fn by_tier(&self, tier: Tier) -> impl Iterator<Item = &LocalContent> {
        self.items.iter().filter(move |c| c.tier == tier)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn random_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, url: &str, tier: Tier) -> DraftForm {
        DraftForm {
            name: name.to_string(),
            url: url.to_string(),
            tier,
        }
    }

    #[test]
    fn test_add_assigns_id_and_resets_form() {
        let mut book = DraftBook::new();
        let mut f = form(" Trailer ", "http://cdn.example.com/t.mp4", Tier::Tier2);
        let added = book.add(&mut f).unwrap().clone();

        assert_eq!(added.name, "Trailer");
        assert_eq!(added.tier, Tier::Tier2);
        assert_eq!(added.id.len(), 9);
        assert!(added.id.bytes().all(|b| ID_ALPHABET.contains(&b)));
        assert_eq!(f, DraftForm::default());
    }

    #[test]
    fn test_required_fields() {
        let mut book = DraftBook::new();
        let mut f = form("", "http://x", Tier::Tier1);
        assert_eq!(book.add(&mut f).unwrap_err(), DraftError::MissingName);
        let mut f = form("Clip", "   ", Tier::Tier1);
        assert_eq!(book.add(&mut f).unwrap_err(), DraftError::MissingUrl);
        // rejected forms keep their input
        assert_eq!(f.name, "Clip");
        assert!(book.is_empty());
    }

    #[test]
    fn test_non_tier_rejected() {
        let mut book = DraftBook::new();
        let mut f = form("Clip", "http://x", Tier::NonTier);
        assert_eq!(book.add(&mut f).unwrap_err(), DraftError::UnrankedTier("Non-Tier"));
    }

    #[test]
    fn test_remove_by_id() {
        let mut book = DraftBook::new();
        let first = book.add(&mut form("A", "http://a", Tier::Tier1)).unwrap().id.clone();
        book.add(&mut form("B", "http://b", Tier::Tier1)).unwrap();
        book.add(&mut form("C", "http://c", Tier::Tier3)).unwrap();

        assert!(book.remove(&first));
        assert!(!book.remove(&first));
        assert_eq!(book.len(), 2);
        let tier1: Vec<_> = book.by_tier(Tier::Tier1).map(|c| c.name.as_str()).collect();
        assert_eq!(tier1, vec!["B"]);
        assert_eq!(book.by_tier(Tier::Tier3).count(), 1);
    }
}
