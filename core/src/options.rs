//! Per-call option values and the typed tokens they carry.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, Utc};

/// Lower and upper bound on a timestamp filter; either side may be open.
pub type DateRange = (Option<DateTime<Utc>>, Option<DateTime<Utc>>);

/// Inclusive item indices for a ranged listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRange {
    pub start: u64,
    pub end: u64,
}

impl ItemRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Range covering page `index` (zero-based) of `size` items. `None` when
    /// `size` is zero, since an item range cannot be empty.
    pub fn page(index: u64, size: u64) -> Option<Self> {
        let last = size.checked_sub(1)?;
        let start = index.saturating_mul(size);
        Some(Self {
            start,
            end: start.saturating_add(last),
        })
    }

    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }
}

macro_rules! wire_tokens {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $token:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_tokens!(
    /// Related resources an image response can inline.
    ImageEmbedField {
        Contributor => "contributor",
        GeneralNode => "generalNode",
        Nodes => "nodes",
        SpecificNode => "specificNode",
    }
);

wire_tokens!(
    /// Related resources a node response can inline.
    NodeEmbedField {
        ChildNodes => "childNodes",
        Contributor => "contributor",
        ParentNode => "parentNode",
        PrimaryImage => "primaryImage",
    }
);

wire_tokens!(
    ImageSortField {
        Created => "created",
        Modified => "modified",
        CreatedDescending => "-created",
        ModifiedDescending => "-modified",
    }
);

wire_tokens!(
    NodeSortField {
        Created => "created",
        Modified => "modified",
        Names => "names",
        CreatedDescending => "-created",
        ModifiedDescending => "-modified",
        NamesDescending => "-names",
    }
);

wire_tokens!(
    /// Copyright-license attribute filter. The `Not*` forms exclude the attribute.
    LicenseComponent {
        By => "by",
        Nc => "nc",
        Sa => "sa",
        NotBy => "-by",
        NotNc => "-nc",
        NotSa => "-sa",
    }
);

/// Options for a single-resource GET that only supports revalidation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheableOptions {
    /// Sent as `If-None-Match`.
    pub e_tag: Option<String>,
}

impl CacheableOptions {
    pub fn with_e_tag(e_tag: impl Into<String>) -> Self {
        Self {
            e_tag: Some(e_tag.into()),
        }
    }
}

/// Options for a single-entity GET.
#[derive(Debug, Clone)]
pub struct EntityOptions<E> {
    /// Sent as `If-None-Match`.
    pub e_tag: Option<String>,
    pub embed: HashSet<E>,
}

impl<E> Default for EntityOptions<E> {
    fn default() -> Self {
        Self {
            e_tag: None,
            embed: HashSet::new(),
        }
    }
}

impl<E: Eq + Hash> EntityOptions<E> {
    pub fn with_embed(mut self, fields: impl IntoIterator<Item = E>) -> Self {
        self.embed.extend(fields);
        self
    }

    pub fn with_e_tag(mut self, e_tag: impl Into<String>) -> Self {
        self.e_tag = Some(e_tag.into());
        self
    }
}

/// Options for a ranged listing.
#[derive(Debug, Clone)]
pub struct ListOptions<E = String, S = String> {
    pub range: ItemRange,
    pub created: DateRange,
    pub modified: DateRange,
    pub embed: HashSet<E>,
    /// Positional: the API applies sort keys in the order given.
    pub sort: Vec<S>,
    /// Sent as `If-Match`.
    pub e_tag: Option<String>,
}

impl<E, S> ListOptions<E, S> {
    pub fn new(range: ItemRange) -> Self {
        Self {
            range,
            created: (None, None),
            modified: (None, None),
            embed: HashSet::new(),
            sort: Vec::new(),
            e_tag: None,
        }
    }

    pub fn with_created(mut self, created: DateRange) -> Self {
        self.created = created;
        self
    }

    pub fn with_modified(mut self, modified: DateRange) -> Self {
        self.modified = modified;
        self
    }

    pub fn with_sort(mut self, sort: impl IntoIterator<Item = S>) -> Self {
        self.sort = sort.into_iter().collect();
        self
    }

    pub fn with_e_tag(mut self, e_tag: impl Into<String>) -> Self {
        self.e_tag = Some(e_tag.into());
        self
    }
}

impl<E: Eq + Hash, S> ListOptions<E, S> {
    pub fn with_embed(mut self, fields: impl IntoIterator<Item = E>) -> Self {
        self.embed.extend(fields);
        self
    }
}

pub type NodeListOptions = ListOptions<NodeEmbedField, NodeSortField>;

/// Options for image listings, which also filter by license.
#[derive(Debug, Clone)]
pub struct ImageListOptions {
    pub list: ListOptions<ImageEmbedField, ImageSortField>,
    pub license_components: HashSet<LicenseComponent>,
}

impl ImageListOptions {
    pub fn new(range: ItemRange) -> Self {
        Self {
            list: ListOptions::new(range),
            license_components: HashSet::new(),
        }
    }

    pub fn with_list(mut self, list: ListOptions<ImageEmbedField, ImageSortField>) -> Self {
        self.list = list;
        self
    }

    pub fn with_license_components(
        mut self,
        components: impl IntoIterator<Item = LicenseComponent>,
    ) -> Self {
        self.license_components.extend(components);
        self
    }
}

impl From<ListOptions<ImageEmbedField, ImageSortField>> for ImageListOptions {
    fn from(list: ListOptions<ImageEmbedField, ImageSortField>) -> Self {
        Self {
            list,
            license_components: HashSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_covers_inclusive_indices() {
        assert_eq!(ItemRange::page(0, 10), Some(ItemRange::new(0, 9)));
        assert_eq!(ItemRange::page(3, 25), Some(ItemRange::new(75, 99)));
    }

    #[test]
    fn empty_page_has_no_range() {
        assert_eq!(ItemRange::page(0, 0), None);
        assert_eq!(ItemRange::page(4, 0), None);
    }

    #[test]
    fn inverted_range_is_not_ordered() {
        assert!(ItemRange::new(4, 4).is_ordered());
        assert!(!ItemRange::new(5, 4).is_ordered());
    }

    #[test]
    fn tokens_render_wire_form() {
        assert_eq!(LicenseComponent::NotNc.as_str(), "-nc");
        assert_eq!(ImageEmbedField::GeneralNode.to_string(), "generalNode");
        assert_eq!(NodeSortField::NamesDescending.as_ref(), "-names");
    }
}
