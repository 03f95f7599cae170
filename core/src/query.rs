//! Query-string construction.
//!
//! Options become a `BTreeMap`, so keys come out sorted no matter how the
//! options were built. Set-valued parameters (`embed`, `licensecomponents`)
//! are sorted and space-joined; `sort` keeps the caller's order because the
//! API applies sort keys positionally.
//!
//! Values are percent-encoded as URI components (`-_.!~*'()` and
//! alphanumerics stay literal), then `%20` becomes `+`.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::options::{DateRange, EntityOptions, ImageListOptions, ListOptions};

pub type Query = BTreeMap<String, String>;

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn iso_timestamp(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Lexicographically sorted, space-joined tokens.
pub fn sorted_tokens<T: AsRef<str>>(tokens: impl IntoIterator<Item = T>) -> String {
    let mut tokens: Vec<T> = tokens.into_iter().collect();
    tokens.sort_by(|a, b| a.as_ref().cmp(b.as_ref()));
    let tokens: Vec<&str> = tokens.iter().map(|token| token.as_ref()).collect();
    tokens.join(" ")
}

fn insert_dates(query: &mut Query, prefix: &str, dates: &DateRange) {
    if let Some(after) = &dates.0 {
        query.insert(format!("{prefix}_gt"), iso_timestamp(after));
    }
    if let Some(before) = &dates.1 {
        query.insert(format!("{prefix}_lt"), iso_timestamp(before));
    }
}

pub fn create_entity_query<E: AsRef<str>>(options: &EntityOptions<E>) -> Query {
    let mut query = Query::new();
    if !options.embed.is_empty() {
        query.insert("embed".to_string(), sorted_tokens(&options.embed));
    }
    query
}

pub fn create_list_query<E: AsRef<str>, S: AsRef<str>>(options: &ListOptions<E, S>) -> Query {
    let mut query = Query::new();
    insert_dates(&mut query, "created", &options.created);
    insert_dates(&mut query, "modified", &options.modified);
    if !options.embed.is_empty() {
        query.insert("embed".to_string(), sorted_tokens(&options.embed));
    }
    if !options.sort.is_empty() {
        let sort: Vec<&str> = options.sort.iter().map(|field| field.as_ref()).collect();
        query.insert("sort".to_string(), sort.join(" "));
    }
    query
}

pub fn create_image_list_query(options: &ImageListOptions) -> Query {
    let mut query = create_list_query(&options.list);
    if !options.license_components.is_empty() {
        query.insert(
            "licensecomponents".to_string(),
            sorted_tokens(&options.license_components),
        );
    }
    query
}

/// Characters a URI component may carry unescaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn encode(value: &str) -> String {
    // Every '%' in the output starts an escape, so this only rewrites spaces.
    utf8_percent_encode(value, COMPONENT)
        .to_string()
        .replace("%20", "+")
}

/// `?key=value&...` with sorted keys, or an empty string for an empty query.
pub fn format_query(query: &Query) -> String {
    if query.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = query
        .iter()
        .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
        .collect();
    format!("?{}", pairs.join("&"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::TimeZone;

    use super::*;
    use crate::options::{
        ImageEmbedField, ImageSortField, ItemRange, LicenseComponent, NodeEmbedField,
    };

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn expected(pairs: &[(&str, &str)]) -> Query {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn simple_range_has_no_parameters() {
        let options: ListOptions = ListOptions::new(ItemRange::new(0, 1));
        assert!(create_list_query(&options).is_empty());
        assert_eq!(format_query(&create_list_query(&options)), "");
    }

    #[test]
    fn timestamps_have_millisecond_precision() {
        assert_eq!(iso_timestamp(&date(2020, 11, 10)), "2020-11-10T00:00:00.000Z");
    }

    #[test]
    fn open_ended_date_ranges_emit_one_bound() {
        let options: ListOptions = ListOptions::new(ItemRange::new(0, 1))
            .with_created((Some(date(2020, 1, 1)), None))
            .with_modified((None, Some(date(2020, 11, 10))));
        assert_eq!(
            create_list_query(&options),
            expected(&[
                ("created_gt", "2020-01-01T00:00:00.000Z"),
                ("modified_lt", "2020-11-10T00:00:00.000Z"),
            ])
        );
    }

    #[test]
    fn embed_is_sorted_and_sort_is_positional() {
        let options: ListOptions = ListOptions::new(ItemRange::new(0, 1))
            .with_embed(["c".to_string(), "a".to_string(), "b".to_string()])
            .with_sort(["b".to_string(), "a".to_string()]);
        assert_eq!(
            create_list_query(&options),
            expected(&[("embed", "a b c"), ("sort", "b a")])
        );
    }

    #[test]
    fn license_components_are_sorted() {
        let options = ImageListOptions::new(ItemRange::new(0, 1)).with_license_components([
            LicenseComponent::By,
            LicenseComponent::NotNc,
            LicenseComponent::NotSa,
        ]);
        assert_eq!(
            create_image_list_query(&options),
            expected(&[("licensecomponents", "-nc -sa by")])
        );
    }

    #[test]
    fn image_list_with_every_option() {
        let list = ListOptions::new(ItemRange::new(0, 1))
            .with_created((Some(date(2020, 1, 1)), Some(date(2020, 11, 10))))
            .with_modified((Some(date(2020, 1, 1)), Some(date(2020, 11, 10))))
            .with_embed([ImageEmbedField::GeneralNode, ImageEmbedField::Contributor])
            .with_sort([ImageSortField::Created, ImageSortField::ModifiedDescending]);
        let options = ImageListOptions::from(list).with_license_components([
            LicenseComponent::By,
            LicenseComponent::NotNc,
            LicenseComponent::NotSa,
        ]);
        assert_eq!(
            create_image_list_query(&options),
            expected(&[
                ("created_gt", "2020-01-01T00:00:00.000Z"),
                ("created_lt", "2020-11-10T00:00:00.000Z"),
                ("embed", "contributor generalNode"),
                ("licensecomponents", "-nc -sa by"),
                ("modified_gt", "2020-01-01T00:00:00.000Z"),
                ("modified_lt", "2020-11-10T00:00:00.000Z"),
                ("sort", "created -modified"),
            ])
        );
    }

    #[test]
    fn insertion_order_does_not_leak() {
        let forward = EntityOptions::default().with_embed([
            NodeEmbedField::ParentNode,
            NodeEmbedField::ChildNodes,
            NodeEmbedField::PrimaryImage,
        ]);
        let mut reversed = EntityOptions::default();
        for field in [
            NodeEmbedField::PrimaryImage,
            NodeEmbedField::ChildNodes,
            NodeEmbedField::ParentNode,
        ] {
            reversed.embed.insert(field);
        }
        let a = format_query(&create_entity_query(&forward));
        let b = format_query(&create_entity_query(&reversed));
        assert_eq!(a, b);
        assert_eq!(a, "?embed=childNodes+parentNode+primaryImage");
    }

    #[test]
    fn empty_embed_set_is_omitted() {
        let options: EntityOptions<ImageEmbedField> = EntityOptions {
            e_tag: Some("abc".to_string()),
            embed: HashSet::new(),
        };
        assert!(create_entity_query(&options).is_empty());
    }

    #[test]
    fn format_query_sorts_and_encodes() {
        let query = expected(&[
            ("string", "This is a string, isn't it?"),
            ("boolean", "true"),
            ("number", "1.234"),
        ]);
        assert_eq!(
            format_query(&query),
            "?boolean=true&number=1.234&string=This+is+a+string%2C+isn't+it%3F"
        );
    }

    #[test]
    fn format_query_keeps_component_marks_literal() {
        let query = expected(&[("q", "a~b (c)! *d* 100%")]);
        assert_eq!(format_query(&query), "?q=a~b+(c)!+*d*+100%25");
    }

    #[test]
    fn format_query_encodes_timestamps() {
        let query = expected(&[("created_gt", "2020-01-01T00:00:00.000Z")]);
        assert_eq!(format_query(&query), "?created_gt=2020-01-01T00%3A00%3A00.000Z");
    }
}
