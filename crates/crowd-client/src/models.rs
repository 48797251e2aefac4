//! Crowd user management models and their XML shapes.

use crowd_core::query::QueryParams;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A named attribute holding an ordered list of string values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "attribute")]
pub struct Attribute {
    /// Attribute name.
    #[serde(rename = "@name")]
    pub name: String,
    /// Attribute values in server order.
    #[serde(default, with = "value_list")]
    pub values: Vec<String>,
}

impl Attribute {
    /// Create an attribute from a name and values.
    pub fn new<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Values joined with a single space.
    #[must_use]
    pub fn joined(&self) -> String {
        self.values.join(" ")
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.name, self.values)
    }
}

/// Ordered collection of attributes.
///
/// Names are expected to be unique but this is not enforced; lookups return the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "attributes")]
pub struct Attributes {
    #[serde(rename = "attribute", default)]
    items: Vec<Attribute>,
}

impl Attributes {
    /// Create an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Returns true if an attribute with exactly this name exists.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.items.iter().any(|attr| attr.name == name)
    }

    /// Values of the first attribute with this name.
    #[must_use]
    pub fn get_list(&self, name: &str) -> Option<&[String]> {
        self.items
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.values.as_slice())
    }

    /// Values of the first attribute with this name joined with a space, or `""`.
    #[must_use]
    pub fn get(&self, name: &str) -> String {
        self.get_list(name)
            .map(|values| values.join(" "))
            .unwrap_or_default()
    }

    /// Map every attribute name to its joined value; later duplicates win.
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.items
            .iter()
            .map(|attr| (attr.name.clone(), attr.joined()))
            .collect()
    }

    /// Append an attribute.
    pub fn push(&mut self, attribute: Attribute) {
        self.items.push(attribute);
    }

    /// Iterate over the attributes in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.items.iter()
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume the collection into its attributes.
    #[must_use]
    pub fn into_vec(self) -> Vec<Attribute> {
        self.items
    }
}

impl From<Vec<Attribute>> for Attributes {
    fn from(items: Vec<Attribute>) -> Self {
        Self { items }
    }
}

impl FromIterator<Attribute> for Attributes {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Attributes {
    type Item = Attribute;
    type IntoIter = std::vec::IntoIter<Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Convert attributes to a `name -> joined value` map.
#[must_use]
pub fn simplify_attributes(attributes: &Attributes) -> HashMap<String, String> {
    attributes.to_map()
}

/// A directory user.
///
/// `password` is write-only: it is sent when creating a user and never read back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "user")]
pub struct User {
    /// Username.
    #[serde(rename = "@name")]
    pub name: String,
    /// First name.
    #[serde(rename = "first-name", default)]
    pub first_name: String,
    /// Last name.
    #[serde(rename = "last-name", default)]
    pub last_name: String,
    /// Display name.
    #[serde(rename = "display-name", default)]
    pub display_name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Opaque key assigned by the directory.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    /// Password used when creating the user.
    #[serde(
        skip_deserializing,
        skip_serializing_if = "password_is_empty",
        serialize_with = "password_value::serialize"
    )]
    pub password: Option<String>,
    /// Whether the account is active.
    #[serde(rename = "active", default)]
    pub is_active: bool,
    /// Inlined attributes, present when requested with the attribute expansion.
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl User {
    /// Create a user with only the username set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

fn password_is_empty(password: &Option<String>) -> bool {
    password.as_deref().map_or(true, str::is_empty)
}

/// A directory group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "group")]
pub struct Group {
    /// Group name.
    #[serde(rename = "@name")]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Group type as reported by the directory (usually `GROUP`).
    #[serde(rename = "type", default)]
    pub group_type: String,
    /// Whether the group is active.
    #[serde(rename = "active", default)]
    pub is_active: bool,
    /// Inlined attributes, present when requested with the attribute expansion.
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

/// Minimal user reference used in membership listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename = "user")]
pub struct UserInfo {
    /// Username.
    #[serde(rename = "@name")]
    pub name: String,
}

impl fmt::Display for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A group together with the users that belong to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "membership")]
pub struct Membership {
    /// Group name.
    #[serde(rename = "@group")]
    pub group: String,
    /// Member users.
    #[serde(default, with = "user_info_list")]
    pub users: Vec<UserInfo>,
}

/// Which relationship graph a membership query traverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MembershipKind {
    /// Explicit membership.
    Direct,
    /// Membership inherited through the group hierarchy.
    Nested,
}

impl MembershipKind {
    /// Path segment used by the REST API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Nested => "nested",
        }
    }
}

impl fmt::Display for MembershipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pagination parameters for listing and search operations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListingOptions {
    /// Index of the first result; negative values are omitted.
    pub start_index: Option<i64>,
    /// Maximum number of results; zero or negative values are omitted.
    pub max_results: Option<i64>,
}

impl ListingOptions {
    /// Options with both fields set.
    #[must_use]
    pub const fn new(start_index: i64, max_results: i64) -> Self {
        Self {
            start_index: Some(start_index),
            max_results: Some(max_results),
        }
    }

    /// Set the start index.
    #[must_use]
    pub const fn with_start_index(mut self, start_index: i64) -> Self {
        self.start_index = Some(start_index);
        self
    }

    /// Set the maximum number of results.
    #[must_use]
    pub const fn with_max_results(mut self, max_results: i64) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Encode as a query-string suffix: `&start-index=N&max-results=M`, either part optional.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut params = QueryParams::new();
        params.push_opt("start-index", self.start_index.filter(|index| *index >= 0));
        params.push_opt("max-results", self.max_results.filter(|max| *max > 0));
        params.encode_suffix()
    }
}

/// Request body for authenticating a user.
#[derive(Serialize)]
#[serde(rename = "password")]
pub(crate) struct PasswordCredential<'a> {
    pub(crate) value: &'a str,
}

/// `<users><user/>*</users>`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct UserList {
    #[serde(rename = "user", default)]
    pub(crate) users: Vec<User>,
}

/// `<groups><group/>*</groups>`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct GroupList {
    #[serde(rename = "group", default)]
    pub(crate) groups: Vec<Group>,
}

/// `<memberships><membership/>*</memberships>`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct MembershipList {
    #[serde(rename = "membership", default)]
    pub(crate) memberships: Vec<Membership>,
}

mod value_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize)]
    struct ValuesRef<'a> {
        value: &'a [String],
    }

    #[derive(Deserialize)]
    struct Values {
        #[serde(default)]
        value: Vec<String>,
    }

    pub(super) fn serialize<S>(values: &[String], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ValuesRef { value: values }.serialize(serializer)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Values::deserialize(deserializer).map(|values| values.value)
    }
}

mod user_info_list {
    use super::UserInfo;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize)]
    struct UsersRef<'a> {
        user: &'a [UserInfo],
    }

    #[derive(Deserialize)]
    struct Users {
        #[serde(default)]
        user: Vec<UserInfo>,
    }

    pub(super) fn serialize<S>(users: &[UserInfo], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        UsersRef { user: users }.serialize(serializer)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<UserInfo>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Users::deserialize(deserializer).map(|users| users.user)
    }
}

mod password_value {
    use serde::{Serialize, Serializer};

    #[derive(Serialize)]
    struct PasswordValue<'a> {
        value: &'a str,
    }

    pub(super) fn serialize<S>(password: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match password {
            Some(value) => PasswordValue { value }.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crowd_core::xml::{from_xml, to_xml};

    fn sample_attributes() -> Attributes {
        Attributes::from(vec![
            Attribute::new("test", ["AB", "CD"]),
            Attribute::new("magic", ["ABCD"]),
        ])
    }

    #[test]
    fn has_matches_exact_name() {
        let attrs = sample_attributes();
        assert!(attrs.has("test"));
        assert!(attrs.has("magic"));
        assert!(!attrs.has("Test"));
        assert!(!attrs.has("unknown"));
        assert!(!Attributes::new().has("test"));
    }

    #[test]
    fn get_joins_values_with_single_space() {
        let attrs = sample_attributes();
        assert_eq!(attrs.get("test"), "AB CD");
        assert_eq!(attrs.get("magic"), "ABCD");
        assert_eq!(attrs.get("unknown"), "");
        assert_eq!(
            attrs.get_list("test"),
            Some(&["AB".to_string(), "CD".to_string()][..])
        );
        assert_eq!(attrs.get_list("unknown"), None);
    }

    #[test]
    fn get_returns_empty_for_attribute_without_values() {
        let attrs = Attributes::from(vec![Attribute::new("empty", Vec::<String>::new())]);
        assert!(attrs.has("empty"));
        assert_eq!(attrs.get("empty"), "");
    }

    #[test]
    fn lookups_use_first_duplicate_and_map_uses_last() {
        let attrs = Attributes::from(vec![
            Attribute::new("dup", ["first"]),
            Attribute::new("dup", ["second"]),
        ]);
        assert_eq!(attrs.get("dup"), "first");
        assert_eq!(attrs.to_map()["dup"], "second");
    }

    #[test]
    fn to_map_flattens_every_attribute() {
        let map = simplify_attributes(&sample_attributes());
        assert_eq!(map.len(), 2);
        assert_eq!(map["test"], "AB CD");
        assert_eq!(map["magic"], "ABCD");
    }

    #[test]
    fn attribute_display() {
        assert_eq!(
            Attribute::new("test", ["AB", "CD"]).to_string(),
            r#"test:["AB", "CD"]"#
        );
    }

    #[test]
    fn listing_options_encoding() {
        assert_eq!(ListingOptions::default().encode(), "");
        assert_eq!(
            ListingOptions::default().with_max_results(3).encode(),
            "&max-results=3"
        );
        assert_eq!(
            ListingOptions::default().with_start_index(5).encode(),
            "&start-index=5"
        );
        assert_eq!(ListingOptions::new(5, 7).encode(), "&start-index=5&max-results=7");
        assert_eq!(ListingOptions::new(-1, 0).encode(), "");
        assert_eq!(ListingOptions::new(0, 10).encode(), "&start-index=0&max-results=10");
    }

    #[test]
    fn membership_kind_segments() {
        assert_eq!(MembershipKind::Direct.as_str(), "direct");
        assert_eq!(MembershipKind::Nested.to_string(), "nested");
    }

    #[test]
    fn user_serialization_omits_empty_password_and_key() {
        let mut user = User::new("jdoe");
        user.first_name = "John".to_string();
        user.password = Some(String::new());

        let xml = String::from_utf8(to_xml(&user).unwrap()).unwrap();
        assert!(xml.contains(r#"<user name="jdoe">"#));
        assert!(xml.contains("<first-name>John</first-name>"));
        assert!(!xml.contains("<password>"));
        assert!(!xml.contains("<key>"));
        assert!(!xml.contains("<attributes>"));
    }

    #[test]
    fn user_serialization_writes_password_value() {
        let mut user = User::new("jdoe");
        user.password = Some("s3cret".to_string());
        user.attributes.push(Attribute::new("team", ["core"]));

        let xml = String::from_utf8(to_xml(&user).unwrap()).unwrap();
        assert!(xml.contains("<password><value>s3cret</value></password>"));
        assert!(xml.contains(
            r#"<attributes><attribute name="team"><values><value>core</value></values></attribute></attributes>"#
        ));
    }

    #[test]
    fn user_deserialization_never_reads_password() {
        let doc = br#"<user name="jdoe"><first-name>John</first-name>
            <password><value>leaked</value></password><active>true</active></user>"#;

        let user: User = from_xml(doc).unwrap();
        assert_eq!(user.name, "jdoe");
        assert!(user.is_active);
        assert_eq!(user.password, None);
    }

    #[test]
    fn user_round_trip_preserves_readable_fields() {
        let mut user = User::new("jdoe");
        user.first_name = "John".to_string();
        user.last_name = "Doe".to_string();
        user.display_name = "John Doe".to_string();
        user.email = "jdoe@example.com".to_string();
        user.key = "32769:1234".to_string();
        user.is_active = true;
        user.password = Some("s3cret".to_string());
        user.attributes.push(Attribute::new("phones", ["123", "456"]));

        let echoed: User = from_xml(&to_xml(&user).unwrap()).unwrap();

        let expected = User {
            password: None,
            ..user
        };
        assert_eq!(echoed, expected);
    }

    #[test]
    fn user_round_trip_keeps_padded_text() {
        let mut user = User::new("jdoe");
        user.first_name = "  ".to_string();
        user.display_name = " John  Doe ".to_string();
        user.email = "\tjdoe@example.com\n".to_string();
        user.attributes
            .push(Attribute::new("notes", [" leading", "trailing ", " "]));

        let echoed: User = from_xml(&to_xml(&user).unwrap()).unwrap();

        assert_eq!(echoed.first_name, "  ");
        assert_eq!(echoed.display_name, " John  Doe ");
        assert_eq!(echoed.email, "\tjdoe@example.com\n");
        assert_eq!(
            echoed.attributes.get_list("notes"),
            Some(&[" leading".to_string(), "trailing ".to_string(), " ".to_string()][..])
        );
        assert_eq!(echoed, user);
    }

    #[test]
    fn indented_documents_still_parse() {
        let doc = br#"<user name="jdoe">
            <first-name> John</first-name>
            <attributes>
                <attribute name="team">
                    <values>
                        <value>core </value>
                    </values>
                </attribute>
            </attributes>
            <active>true</active>
        </user>"#;

        let user: User = from_xml(doc).unwrap();
        assert_eq!(user.first_name, " John");
        assert_eq!(user.attributes.get("team"), "core ");
        assert!(user.is_active);
    }

    #[test]
    fn attributes_round_trip_as_root_document() {
        let attrs = sample_attributes();
        let xml = to_xml(&attrs).unwrap();
        assert!(String::from_utf8(xml.clone())
            .unwrap()
            .contains("<attributes><attribute name=\"test\">"));

        let parsed: Attributes = from_xml(&xml).unwrap();
        assert_eq!(parsed, attrs);
    }

    #[test]
    fn membership_parses_user_references() {
        let doc = br#"<membership group="devs"><users><user name="a"/><user name="b"/></users></membership>"#;
        let membership: Membership = from_xml(doc).unwrap();
        assert_eq!(membership.group, "devs");
        assert_eq!(
            membership.users.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }
}
