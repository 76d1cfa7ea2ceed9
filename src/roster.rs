//! Candidate rosters grouped by ward.
//!
//! Roster sources label wards inconsistently: a CSV export may say `"01"` while a JSON
//! export says `"Ward 1"` and the boundary file says `"1 Etobicoke North"`. Every label goes
//! through a [`WardIdNormalizer`] before grouping, and the same normalizer type is used on
//! the ward boundaries so both sides meet on one [`WardId`].

use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use crate::MapError;

/// A normalized ward identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WardId(String);

impl WardId {
    /// Wraps an already normalized identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single step of ward label normalization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WardIdRule {
    /// Strip surrounding whitespace.
    Trim,
    /// Remove a literal prefix, such as `"Ward "`.
    StripPrefix(String),
    /// Keep the leading run of digits. Labels that do not start with a digit are left as is.
    LeadingInteger,
    /// Keep the last run of digits anywhere in the label. Labels without digits are left as is.
    TrailingInteger,
    /// Remove leading zeros, keeping a lone `0`.
    StripLeadingZeros,
    /// Lowercase the label.
    Lowercase,
}

impl WardIdRule {
    fn apply(&self, label: String) -> String {
        match self {
            WardIdRule::Trim => label.trim().to_string(),
            WardIdRule::StripPrefix(prefix) => match label.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.to_string(),
                None => label,
            },
            WardIdRule::LeadingInteger => {
                let digits: String = label
                    .trim_start()
                    .chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect();
                if digits.is_empty() {
                    label
                } else {
                    strip_zeros(&digits)
                }
            }
            WardIdRule::TrailingInteger => {
                let end = match label.rfind(|c: char| c.is_ascii_digit()) {
                    Some(i) => i + 1,
                    None => return label,
                };
                let start = label[..end]
                    .rfind(|c: char| !c.is_ascii_digit())
                    .map_or(0, |i| i + 1);
                strip_zeros(&label[start..end])
            }
            WardIdRule::StripLeadingZeros => strip_zeros(&label),
            WardIdRule::Lowercase => label.to_lowercase(),
        }
    }
}

fn strip_zeros(s: &str) -> String {
    let stripped = s.trim_start_matches('0');
    if stripped.is_empty() && !s.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

/// An ordered list of [`WardIdRule`]s applied to raw ward labels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WardIdNormalizer {
    rules: Vec<WardIdRule>,
}

impl Default for WardIdNormalizer {
    /// Trims the label and keeps its leading number, so `" 07 "` and `"7 Toronto Centre"`
    /// both become `"7"`.
    fn default() -> Self {
        Self::new(vec![WardIdRule::Trim, WardIdRule::LeadingInteger])
    }
}

impl WardIdNormalizer {
    /// Creates a normalizer from rules, applied in order.
    pub fn new(rules: Vec<WardIdRule>) -> Self {
        Self { rules }
    }

    /// The rules, in application order.
    pub fn rules(&self) -> &[WardIdRule] {
        &self.rules
    }

    /// Normalizes a raw label.
    pub fn normalize(&self, label: &str) -> WardId {
        WardId(
            self.rules
                .iter()
                .fold(label.to_string(), |label, rule| rule.apply(label)),
        )
    }
}

/// A person running for, or holding, a ward seat.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// The ward label as it appears in the source, before normalization.
    #[serde(default, alias = "Ward", deserialize_with = "de_label")]
    pub ward: String,

    /// Display name.
    #[serde(default, alias = "Name")]
    pub name: String,

    /// Date the nomination was filed, as written in the source.
    #[serde(default, alias = "Nomination Date", deserialize_with = "de_opt_label")]
    pub nomination_date: Option<String>,

    /// Whether the candidate currently holds the seat.
    #[serde(default, alias = "Incumbent", deserialize_with = "de_flag")]
    pub incumbent: bool,

    /// Contact email.
    #[serde(default, alias = "Email", deserialize_with = "de_opt_label")]
    pub email: Option<String>,

    /// Campaign website.
    #[serde(default, alias = "Website", deserialize_with = "de_opt_label")]
    pub website: Option<String>,

    /// Contact phone number.
    #[serde(default, alias = "Phone", deserialize_with = "de_opt_label")]
    pub phone: Option<String>,
}

/// A loosely typed JSON value. Exports are inconsistent about quoting numbers and booleans.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Text(s) => s,
        }
    }
}

fn de_opt_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(value
        .map(Scalar::into_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn de_label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(de_opt_label(deserializer)?.unwrap_or_default())
}

fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        Some(Scalar::Bool(b)) => b,
        Some(Scalar::Int(i)) => i != 0,
        Some(Scalar::Float(f)) => f != 0.0,
        Some(Scalar::Text(s)) => parse_flag(&s),
        None => false,
    })
}

/// Parses the yes/no spellings found in roster exports.
pub fn parse_flag(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "1" | "x"
    )
}

/// The file format of a roster source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RosterFormat {
    /// Pick by file extension.
    #[default]
    Auto,
    /// Comma separated values with a header row.
    Csv,
    /// A JSON array of records, or an object with a `councillors` array.
    Json,
}

impl RosterFormat {
    /// Resolves `Auto` using the extension of `path`.
    pub fn resolve(self, path: &Path) -> Result<RosterFormat, MapError> {
        match self {
            RosterFormat::Auto => {
                let extension = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_ascii_lowercase());
                match extension.as_deref() {
                    Some("csv") => Ok(RosterFormat::Csv),
                    Some("json") => Ok(RosterFormat::Json),
                    _ => Err(MapError::UnknownFormat(path.to_path_buf())),
                }
            }
            format => Ok(format),
        }
    }
}

/// A CSV row. Cells are read as text so labels like `"01"` keep their zeros.
#[derive(Deserialize)]
struct CsvRow {
    #[serde(alias = "Ward")]
    ward: Option<String>,
    #[serde(alias = "Name")]
    name: Option<String>,
    #[serde(alias = "Nomination Date")]
    nomination_date: Option<String>,
    #[serde(alias = "Incumbent")]
    incumbent: Option<String>,
    #[serde(alias = "Email")]
    email: Option<String>,
    #[serde(alias = "Website")]
    website: Option<String>,
    #[serde(alias = "Phone")]
    phone: Option<String>,
}

impl From<CsvRow> for Candidate {
    fn from(row: CsvRow) -> Self {
        Candidate {
            ward: row.ward.unwrap_or_default(),
            name: row.name.unwrap_or_default(),
            nomination_date: row.nomination_date,
            incumbent: row.incumbent.as_deref().is_some_and(parse_flag),
            email: row.email,
            website: row.website,
            phone: row.phone,
        }
    }
}

/// Reads candidate records from CSV with a header row.
///
/// Short rows are accepted and missing cells come out empty.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Candidate>, MapError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut candidates = Vec::new();
    for row in rdr.deserialize::<CsvRow>() {
        candidates.push(row?.into());
    }
    Ok(candidates)
}

/// Reads candidate records from JSON.
pub fn read_json(json: &str) -> Result<Vec<Candidate>, MapError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Document {
        Bare(Vec<Candidate>),
        Wrapped { councillors: Vec<Candidate> },
    }

    Ok(match serde_json::from_str(json)? {
        Document::Bare(candidates) => candidates,
        Document::Wrapped { councillors } => councillors,
    })
}

/// Candidates grouped by normalized ward id.
#[derive(Clone, Debug, Default)]
pub struct CandidateRoster {
    by_ward: HashMap<WardId, Vec<Candidate>>,
}

impl CandidateRoster {
    /// Groups `candidates` by normalized ward. Candidates sharing a ward keep their input
    /// order. Records are kept as they are, missing fields included.
    pub fn index(
        candidates: impl IntoIterator<Item = Candidate>,
        normalizer: &WardIdNormalizer,
    ) -> Self {
        let mut by_ward: HashMap<WardId, Vec<Candidate>> = HashMap::new();
        for candidate in candidates {
            by_ward
                .entry(normalizer.normalize(&candidate.ward))
                .or_default()
                .push(candidate);
        }
        Self { by_ward }
    }

    /// Reads and indexes a roster file.
    pub fn load(
        path: &Path,
        format: RosterFormat,
        normalizer: &WardIdNormalizer,
    ) -> Result<Self, MapError> {
        let candidates = match format.resolve(path)? {
            RosterFormat::Csv => {
                let file = std::fs::File::open(path).map_err(|source| MapError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                read_csv(file)?
            }
            _ => {
                let json = std::fs::read_to_string(path).map_err(|source| MapError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                read_json(&json)?
            }
        };
        let roster = Self::index(candidates, normalizer);
        debug!(
            "Loaded {} candidates in {} wards from {}",
            roster.len(),
            roster.ward_count(),
            path.display()
        );
        Ok(roster)
    }

    /// The candidates of a ward, in source order. Unknown wards have none.
    pub fn candidates(&self, ward: &WardId) -> &[Candidate] {
        self.by_ward.get(ward).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of distinct wards.
    pub fn ward_count(&self) -> usize {
        self.by_ward.len()
    }

    /// Total number of candidates.
    pub fn len(&self) -> usize {
        self.by_ward.values().map(Vec::len).sum()
    }

    /// Whether the roster has no candidates.
    pub fn is_empty(&self) -> bool {
        self.by_ward.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(ward: &str, name: &str) -> Candidate {
        Candidate {
            ward: ward.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn names(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn leading_zeros_group_together() {
        let normalizer = WardIdNormalizer::new(vec![WardIdRule::Trim, WardIdRule::StripLeadingZeros]);
        let roster = CandidateRoster::index(
            vec![candidate("1", "A"), candidate("01", "B")],
            &normalizer,
        );
        assert_eq!(roster.ward_count(), 1);
        assert_eq!(names(roster.candidates(&WardId::new("1"))), vec!["A", "B"]);
    }

    #[test]
    fn grouping_keeps_input_order_per_ward() {
        let input = vec![
            candidate("2", "Ng"),
            candidate("1", "Adams"),
            candidate(" 02", "Chen"),
            candidate("1", "Baker"),
            candidate("2 ", "Okafor"),
        ];
        let roster = CandidateRoster::index(input, &WardIdNormalizer::default());
        assert_eq!(names(roster.candidates(&WardId::new("1"))), vec!["Adams", "Baker"]);
        assert_eq!(
            names(roster.candidates(&WardId::new("2"))),
            vec!["Ng", "Chen", "Okafor"]
        );
        assert_eq!(roster.len(), 5);
        assert_eq!(roster.ward_count(), 2);
    }

    #[test]
    fn unknown_ward_has_no_candidates() {
        let roster = CandidateRoster::index(vec![candidate("1", "A")], &WardIdNormalizer::default());
        assert!(roster.candidates(&WardId::new("9")).is_empty());
        assert!(CandidateRoster::default().is_empty());
    }

    #[test]
    fn nameless_rows_are_kept_in_order() {
        let nameless = Candidate {
            ward: "1".to_string(),
            email: Some("x@y".to_string()),
            ..Default::default()
        };
        let roster = CandidateRoster::index(
            vec![candidate("1", "A"), nameless.clone(), candidate("1", "B")],
            &WardIdNormalizer::default(),
        );
        let names: Vec<_> = roster
            .candidates(&WardId::new("1"))
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "", "B"]);
        assert_eq!(roster.candidates(&WardId::new("1"))[1], nameless);
    }

    #[test]
    fn rules_apply_in_order() {
        let json_labels = WardIdNormalizer::new(vec![
            WardIdRule::Trim,
            WardIdRule::StripPrefix("Ward ".to_string()),
            WardIdRule::StripLeadingZeros,
        ]);
        assert_eq!(json_labels.normalize("  Ward 07 ").as_str(), "7");
        assert_eq!(json_labels.normalize("Beaches").as_str(), "Beaches");

        let area_names = WardIdNormalizer::new(vec![WardIdRule::TrailingInteger]);
        assert_eq!(area_names.normalize("Etobicoke North (01)").as_str(), "1");
        assert_eq!(area_names.normalize("Ward 25").as_str(), "25");
        assert_eq!(area_names.normalize("Downtown").as_str(), "Downtown");

        assert_eq!(WardIdNormalizer::default().normalize("12 Spadina").as_str(), "12");
        assert_eq!(WardIdNormalizer::default().normalize("Spadina").as_str(), "Spadina");
        assert_eq!(WardIdNormalizer::new(Vec::new()).normalize(" 01 ").as_str(), " 01 ");
        assert_eq!(
            WardIdNormalizer::new(vec![WardIdRule::Lowercase]).normalize("Ward A").as_str(),
            "ward a"
        );
    }

    #[test]
    fn strip_leading_zeros_keeps_zero() {
        let normalizer = WardIdNormalizer::new(vec![WardIdRule::StripLeadingZeros]);
        assert_eq!(normalizer.normalize("000").as_str(), "0");
        assert_eq!(normalizer.normalize("").as_str(), "");
        assert_eq!(normalizer.normalize("0120").as_str(), "120");
    }

    #[test]
    fn read_csv_roster() {
        let csv = "\
ward,name,nomination_date,incumbent,email,website,phone
01,\"Crawford, Gary\",2018-05-01,true,gary@example.org,https://example.org,416-555-0100
1,Jane Doe,2018-06-12,,,,
2,Short Row
";
        let candidates = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(candidates.len(), 3);

        assert_eq!(candidates[0].ward, "01");
        assert_eq!(candidates[0].name, "Crawford, Gary");
        assert!(candidates[0].incumbent);
        assert_eq!(candidates[0].email.as_deref(), Some("gary@example.org"));
        assert_eq!(candidates[0].phone.as_deref(), Some("416-555-0100"));

        assert!(!candidates[1].incumbent);
        assert_eq!(candidates[1].email, None);
        assert_eq!(candidates[1].nomination_date.as_deref(), Some("2018-06-12"));

        assert_eq!(candidates[2].name, "Short Row");
        assert_eq!(candidates[2].website, None);
    }

    #[test]
    fn read_json_roster_both_shapes() {
        let bare = r#"[{"ward": 3, "name": "A", "incumbent": "Y"}]"#;
        let wrapped = r#"{"councillors": [{"ward": "Ward 3", "name": "B", "incumbent": false, "phone": ""}]}"#;

        let bare = read_json(bare).unwrap();
        assert_eq!(bare[0].ward, "3");
        assert!(bare[0].incumbent);

        let wrapped = read_json(wrapped).unwrap();
        assert_eq!(wrapped[0].ward, "Ward 3");
        assert!(!wrapped[0].incumbent);
        assert_eq!(wrapped[0].phone, None);
    }

    #[test]
    fn read_json_rejects_garbage() {
        assert!(matches!(read_json("{\"wards\": 1}"), Err(MapError::Json(_))));
    }

    #[test]
    fn flag_spellings() {
        for yes in ["true", "TRUE", "yes", "Y", "1", " x "] {
            assert!(parse_flag(yes), "{yes}");
        }
        for no in ["false", "no", "", "0", "incumbent"] {
            assert!(!parse_flag(no), "{no}");
        }
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            RosterFormat::Auto.resolve(Path::new("data/councillors.CSV")).unwrap(),
            RosterFormat::Csv
        );
        assert_eq!(
            RosterFormat::Auto.resolve(Path::new("output.json")).unwrap(),
            RosterFormat::Json
        );
        assert_eq!(
            RosterFormat::Json.resolve(Path::new("roster.txt")).unwrap(),
            RosterFormat::Json
        );
        assert!(matches!(
            RosterFormat::Auto.resolve(Path::new("roster.txt")),
            Err(MapError::UnknownFormat(_))
        ));
    }

    #[test]
    fn normalizer_from_toml() {
        #[derive(Deserialize)]
        struct Holder {
            id_rules: WardIdNormalizer,
        }
        let holder: Holder =
            toml::from_str(r#"id_rules = ["trim", { strip_prefix = "Ward " }, "strip_leading_zeros"]"#)
                .unwrap();
        assert_eq!(
            holder.id_rules.rules(),
            &[
                WardIdRule::Trim,
                WardIdRule::StripPrefix("Ward ".to_string()),
                WardIdRule::StripLeadingZeros,
            ]
        );
    }
}
