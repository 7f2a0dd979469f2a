//! Survey loading, facility resolution and the group cache.
//!
//! Survey data arrives as one file per facility group (a US state). Each
//! file holds every facility of the group; a facility's dataset is the
//! subset of rows whose site column names it. The [`SurveyCache`] keeps
//! parsed group files in memory and is shared between concurrent requests.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

use crate::configuration::{Configuration, RawColumn, category};
use crate::error::{Result, SurveyError};
use crate::models::{CellValue, Dataset};

/// Group codes and their display names.
const GROUPS: [(&str, &str); 50] = [
    ("AL", "ALABAMA"),
    ("AK", "ALASKA"),
    ("AZ", "ARIZONA"),
    ("AR", "ARKANSAS"),
    ("CA", "CALIFORNIA"),
    ("CO", "COLORADO"),
    ("CT", "CONNECTICUT"),
    ("DE", "DELAWARE"),
    ("FL", "FLORIDA"),
    ("GA", "GEORGIA"),
    ("HI", "HAWAII"),
    ("ID", "IDAHO"),
    ("IL", "ILLINOIS"),
    ("IN", "INDIANA"),
    ("IA", "IOWA"),
    ("KS", "KANSAS"),
    ("KY", "KENTUCKY"),
    ("LA", "LOUISIANA"),
    ("ME", "MAINE"),
    ("MD", "MARYLAND"),
    ("MA", "MASSACHUSETTS"),
    ("MI", "MICHIGAN"),
    ("MN", "MINNESOTA"),
    ("MS", "MISSISSIPPI"),
    ("MO", "MISSOURI"),
    ("MT", "MONTANA"),
    ("NE", "NEBRASKA"),
    ("NV", "NEVADA"),
    ("NH", "NEW HAMPSHIRE"),
    ("NJ", "NEW JERSEY"),
    ("NM", "NEW MEXICO"),
    ("NY", "NEW YORK"),
    ("NC", "NORTH CAROLINA"),
    ("ND", "NORTH DAKOTA"),
    ("OH", "OHIO"),
    ("OK", "OKLAHOMA"),
    ("OR", "OREGON"),
    ("PA", "PENNSYLVANIA"),
    ("RI", "RHODE ISLAND"),
    ("SC", "SOUTH CAROLINA"),
    ("SD", "SOUTH DAKOTA"),
    ("TN", "TENNESSEE"),
    ("TX", "TEXAS"),
    ("UT", "UTAH"),
    ("VT", "VERMONT"),
    ("VA", "VIRGINIA"),
    ("WA", "WASHINGTON"),
    ("WV", "WEST VIRGINIA"),
    ("WI", "WISCONSIN"),
    ("WY", "WYOMING"),
];

/// Id of the site column when no column is categorized as one.
const DEFAULT_SITE_COLUMN: &str = "site_name";

/// A validated facility group code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupCode(&'static str);

impl GroupCode {
    /// Parses a group code, case-insensitively.
    ///
    /// # Errors
    /// Returns `SurveyError::InvalidGroup` for unknown codes.
    pub fn parse(code: &str) -> Result<Self> {
        let upper = code.trim().to_ascii_uppercase();
        GROUPS
            .iter()
            .find(|(known, _)| *known == upper)
            .map(|(known, _)| Self(*known))
            .ok_or_else(|| SurveyError::invalid_group(code))
    }

    /// Every known group, in registry order.
    pub fn all() -> impl Iterator<Item = GroupCode> {
        GROUPS.iter().map(|(code, _)| Self(*code))
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Display name of the group.
    pub fn group_name(&self) -> &'static str {
        GROUPS
            .iter()
            .find(|(code, _)| *code == self.0)
            .map_or(self.0, |(_, name)| *name)
    }
}

impl fmt::Display for GroupCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for GroupCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

// Resolved against the registry, never borrowed from the input.
impl<'de> Deserialize<'de> for GroupCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Self::parse(&code).map_err(de::Error::custom)
    }
}

/// A group's survey file: every respondent row plus the column metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSurvey {
    pub dataset: Dataset,
    pub columns: Vec<RawColumn>,
}

impl RawSurvey {
    /// Id of the column naming each row's facility.
    pub fn site_column(&self) -> &str {
        self.columns
            .iter()
            .find(|c| c.category == category::SITE_NAME)
            .map_or(DEFAULT_SITE_COLUMN, |c| c.id.as_str())
    }

    /// The group configuration described by the file header.
    pub fn configuration(&self, group: &GroupCode) -> Configuration {
        Configuration::new(group.as_str(), self.columns.clone())
    }
}

/// Parses a survey file.
///
/// The file is `;` separated. Its first three rows hold the column ids, the
/// question texts and the categories; every further row is one respondent.
///
/// # Errors
/// Returns an error if the file is not valid CSV or lacks the header rows.
pub fn parse_survey(bytes: &[u8]) -> Result<RawSurvey> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record.map_err(|e| SurveyError::csv("Failed to read survey row", e))?);
    }
    if records.len() < 3 {
        return Err(SurveyError::configuration(
            "Survey file must start with id, question text and category rows",
        ));
    }

    let body = records.split_off(3);
    let (ids, texts, categories) = (&records[0], &records[1], &records[2]);
    let columns: Vec<RawColumn> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            RawColumn::new(
                id.trim(),
                texts.get(i).unwrap_or_default(),
                categories.get(i).unwrap_or_default().trim(),
            )
        })
        .collect();

    let header = columns.iter().map(|c| c.id.clone()).collect();
    let rows = body
        .iter()
        .map(|record| record.iter().map(CellValue::from_raw).collect())
        .collect();

    Ok(RawSurvey {
        dataset: Dataset::from_rows(header, rows),
        columns,
    })
}

/// Where group survey files come from.
#[async_trait]
pub trait SurveySource: Send + Sync {
    /// Loads a group's survey file. `Ok(None)` when the group has no data.
    ///
    /// # Errors
    /// Returns an error if existing data cannot be read or parsed.
    async fn load_group(&self, group: &GroupCode) -> Result<Option<RawSurvey>>;
}

/// Reads `{CODE}.csv` files from a directory.
#[derive(Debug, Clone)]
pub struct CsvSurveySource {
    dir: PathBuf,
}

impl CsvSurveySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, group: &GroupCode) -> PathBuf {
        self.dir.join(format!("{}.csv", group.as_str()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl SurveySource for CsvSurveySource {
    async fn load_group(&self, group: &GroupCode) -> Result<Option<RawSurvey>> {
        let path = self.path_for(group);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SurveyError::io(
                    format!("Failed to read {}", path.display()),
                    e,
                ));
            }
        };
        let survey = parse_survey(&bytes)?;
        tracing::info!(
            "Loaded group {}: {} rows, {} columns",
            group,
            survey.dataset.row_count(),
            survey.columns.len()
        );
        Ok(Some(survey))
    }
}

/// A facility selectable within a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
    /// Name as it appears in the site column
    pub name: String,
    /// Upper-case display name
    pub display_name: String,
    /// URL-safe identifier
    pub slug: String,
    /// True for the pseudo-facility covering the whole group
    pub whole_group: bool,
}

impl Facility {
    fn new(name: &str, whole_group: bool) -> Self {
        Self {
            name: name.to_string(),
            display_name: name.to_uppercase(),
            slug: slugify(name),
            whole_group,
        }
    }
}

/// URL form of a facility name: punctuation dropped, spaces removed,
/// lowercased.
pub fn slugify(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .filter(|c| *c != ' ')
        .collect::<String>()
        .to_lowercase()
}

/// Facilities of a group: the whole-group option first, then every site in
/// first-seen order.
pub fn facilities(survey: &RawSurvey, all_facilities_label: &str) -> Vec<Facility> {
    let site_column = survey.site_column();
    let mut list = vec![Facility::new(all_facilities_label, true)];
    if let Some(column) = survey.dataset.column(site_column) {
        list.extend(
            column
                .distinct_texts()
                .into_iter()
                .filter(|name| *name != site_column)
                .map(|name| Facility::new(name, false)),
        );
    }
    list
}

/// Resolves a facility slug to the facility and its rows.
pub fn facility_dataset(
    survey: &RawSurvey,
    slug: &str,
    all_facilities_label: &str,
) -> Option<(Facility, Dataset)> {
    let facility = facilities(survey, all_facilities_label)
        .into_iter()
        .find(|f| f.slug == slug)?;
    if facility.whole_group {
        return Some((facility, survey.dataset.clone()));
    }

    let site = survey.dataset.column(survey.site_column())?;
    let dataset = survey
        .dataset
        .filter_rows(|row| site.cells[row].as_text() == Some(facility.name.as_str()));
    Some((facility, dataset))
}

struct CacheEntry {
    survey: Arc<RawSurvey>,
    loaded_at: Instant,
}

/// Per-group cache of parsed survey files.
///
/// Entries expire after the configured time-to-live and are reloaded on the
/// next access. The entry map is only locked to read or store an entry; a
/// load holds its group's own gate, so loads of one group are serialized
/// while other groups stay readable.
pub struct SurveyCache {
    source: Arc<dyn SurveySource>,
    ttl: Duration,
    entries: RwLock<HashMap<GroupCode, CacheEntry>>,
    gates: Mutex<HashMap<GroupCode, Arc<Mutex<()>>>>,
}

impl SurveyCache {
    pub fn new(source: Arc<dyn SurveySource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            entries: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    fn fresh(&self, entry: &CacheEntry) -> bool {
        entry.loaded_at.elapsed() < self.ttl
    }

    async fn cached(&self, group: &GroupCode) -> Option<Arc<RawSurvey>> {
        let entries = self.entries.read().await;
        entries
            .get(group)
            .filter(|entry| self.fresh(entry))
            .map(|entry| Arc::clone(&entry.survey))
    }

    async fn gate(&self, group: &GroupCode) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().await;
        Arc::clone(gates.entry(group.clone()).or_default())
    }

    /// Returns the group's survey, loading it if absent or expired.
    ///
    /// # Errors
    /// Returns an error if the source fails.
    pub async fn get_or_load(&self, group: &GroupCode) -> Result<Option<Arc<RawSurvey>>> {
        if let Some(survey) = self.cached(group).await {
            return Ok(Some(survey));
        }

        let gate = self.gate(group).await;
        let _loading = gate.lock().await;
        // Another task may have loaded it while we waited for the gate
        if let Some(survey) = self.cached(group).await {
            return Ok(Some(survey));
        }
        self.load(group).await
    }

    /// Reloads the group regardless of its age.
    ///
    /// # Errors
    /// Returns an error if the source fails; the old entry is kept then.
    pub async fn refresh(&self, group: &GroupCode) -> Result<Option<Arc<RawSurvey>>> {
        let gate = self.gate(group).await;
        let _loading = gate.lock().await;
        self.load(group).await
    }

    /// Drops the group from the cache. Returns true if it was cached.
    pub async fn evict(&self, group: &GroupCode) -> bool {
        self.entries.write().await.remove(group).is_some()
    }

    /// Reloads every known group. Returns how many groups have data.
    ///
    /// # Errors
    /// Stops at the first group whose data cannot be read.
    pub async fn refresh_all(&self) -> Result<usize> {
        let mut loaded = 0usize;
        for group in GroupCode::all() {
            if self.refresh(&group).await?.is_some() {
                loaded = loaded.saturating_add(1);
            }
        }
        tracing::info!("Refreshed survey cache: {} groups with data", loaded);
        Ok(loaded)
    }

    /// Every group that has survey data.
    ///
    /// # Errors
    /// Returns an error if a group's data cannot be read.
    pub async fn groups_with_data(&self) -> Result<Vec<GroupCode>> {
        let mut groups = Vec::new();
        for group in GroupCode::all() {
            if self.get_or_load(&group).await?.is_some() {
                groups.push(group);
            }
        }
        Ok(groups)
    }

    /// Facilities of a group with data.
    ///
    /// # Errors
    /// Returns `InvalidGroup` for unknown codes and `FacilityNotFound` when
    /// the group has no data.
    pub async fn facilities(&self, group: &str, all_facilities_label: &str) -> Result<Vec<Facility>> {
        let code = GroupCode::parse(group)?;
        let survey = self
            .get_or_load(&code)
            .await?
            .ok_or_else(|| SurveyError::facility_not_found(code.as_str(), all_facilities_label))?;
        Ok(facilities(&survey, all_facilities_label))
    }

    /// Resolves a group code and facility slug to the facility's raw dataset
    /// and the group configuration.
    ///
    /// # Errors
    /// Returns `InvalidGroup` for unknown codes and `FacilityNotFound` when
    /// the pair does not resolve to any data.
    pub async fn resolve(
        &self,
        group: &str,
        facility: &str,
        all_facilities_label: &str,
    ) -> Result<(GroupCode, Facility, Dataset, Configuration)> {
        let code = GroupCode::parse(group)?;
        let survey = self
            .get_or_load(&code)
            .await?
            .ok_or_else(|| SurveyError::facility_not_found(code.as_str(), facility))?;
        let (resolved, dataset) = facility_dataset(&survey, facility, all_facilities_label)
            .ok_or_else(|| SurveyError::facility_not_found(code.as_str(), facility))?;
        let configuration = survey.configuration(&code);
        Ok((code, resolved, dataset, configuration))
    }

    /// Reads the group from the source and stores the result. Callers hold
    /// the group's gate; the entry map is locked only to store.
    async fn load(&self, group: &GroupCode) -> Result<Option<Arc<RawSurvey>>> {
        let loaded = self.source.load_group(group).await?;
        let mut entries = self.entries.write().await;
        match loaded {
            Some(survey) => {
                let survey = Arc::new(survey);
                entries.insert(
                    group.clone(),
                    CacheEntry {
                        survey: Arc::clone(&survey),
                        loaded_at: Instant::now(),
                    },
                );
                Ok(Some(survey))
            }
            None => {
                entries.remove(group);
                Ok(None)
            }
        }
    }
}

impl fmt::Debug for SurveyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurveyCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    const SAMPLE: &str = "\
ResponseId;StartDate;site;Q1
Response ID;Start date;Site;Did you attend a huddle?
info;date;site_name;huddle
r1;2023-01-05;St. Mary's Hospital;Yes
r2;2023-01-06;Valley Clinic;No
r3;2023-02-01;St. Mary's Hospital;
";

    #[test]
    fn test_group_codes() {
        let code = GroupCode::parse("ca").unwrap();
        assert_eq!(code.as_str(), "CA");
        assert_eq!(code.group_name(), "CALIFORNIA");
        assert!(matches!(
            GroupCode::parse("XX"),
            Err(SurveyError::InvalidGroup { .. })
        ));
        assert_eq!(GroupCode::all().count(), 50);
    }

    #[test]
    fn test_group_code_serde() {
        let code: GroupCode = serde_json::from_str("\"tx\"").unwrap();
        assert_eq!(code.as_str(), "TX");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"TX\"");
        assert!(serde_json::from_str::<GroupCode>("\"ZZ\"").is_err());

        // Deserializing from a transient buffer needs no borrow of the input
        let owned = String::from("[\"ca\",\"NY\"]");
        let codes: Vec<GroupCode> = serde_json::from_str(&owned).unwrap();
        drop(owned);
        assert_eq!(codes, vec![GroupCode::parse("CA").unwrap(), GroupCode::parse("NY").unwrap()]);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("St. Mary's Hospital"), "stmaryshospital");
        assert_eq!(slugify("All Facilities"), "allfacilities");
        assert_eq!(slugify("Valley-Clinic #2"), "valleyclinic2");
    }

    #[test]
    fn test_parse_survey() {
        let survey = parse_survey(SAMPLE.as_bytes()).unwrap();
        assert_eq!(survey.columns.len(), 4);
        assert_eq!(survey.columns[2].category, "site_name");
        assert_eq!(survey.site_column(), "site");
        assert_eq!(survey.dataset.row_count(), 3);
        assert!(survey.dataset.column("Q1").unwrap().cells[2].is_null());
    }

    #[test]
    fn test_parse_survey_requires_header_rows() {
        let result = parse_survey(b"a;b\nA;B\n");
        assert!(matches!(result, Err(SurveyError::Configuration { .. })));
    }

    #[test]
    fn test_facilities_and_filtering() {
        let survey = parse_survey(SAMPLE.as_bytes()).unwrap();
        let list = facilities(&survey, "All Facilities");
        let slugs: Vec<&str> = list.iter().map(|f| f.slug.as_str()).collect();
        assert_eq!(slugs, vec!["allfacilities", "stmaryshospital", "valleyclinic"]);
        assert_eq!(list[1].display_name, "ST. MARY'S HOSPITAL");

        let (facility, dataset) =
            facility_dataset(&survey, "stmaryshospital", "All Facilities").unwrap();
        assert_eq!(facility.name, "St. Mary's Hospital");
        assert_eq!(dataset.row_count(), 2);

        let (_, all) = facility_dataset(&survey, "allfacilities", "All Facilities").unwrap();
        assert_eq!(all.row_count(), 3);
        assert!(facility_dataset(&survey, "nowhere", "All Facilities").is_none());
    }

    struct CountingSource {
        loads: AtomicUsize,
    }

    #[async_trait]
    impl SurveySource for CountingSource {
        async fn load_group(&self, group: &GroupCode) -> Result<Option<RawSurvey>> {
            if group.as_str() != "CA" {
                return Ok(None);
            }
            self.loads.fetch_add(1, Ordering::SeqCst);
            parse_survey(SAMPLE.as_bytes()).map(Some)
        }
    }

    fn cache(ttl: Duration) -> (Arc<CountingSource>, SurveyCache) {
        let source = Arc::new(CountingSource {
            loads: AtomicUsize::new(0),
        });
        let cache = SurveyCache::new(source.clone(), ttl);
        (source, cache)
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_reuses_until_expiry() {
        let (source, cache) = cache(Duration::from_secs(60));
        let ca = GroupCode::parse("CA").unwrap();

        assert!(cache.get_or_load(&ca).await.unwrap().is_some());
        assert!(cache.get_or_load(&ca).await.unwrap().is_some());
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        cache.get_or_load(&ca).await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_refresh_and_evict() {
        let (source, cache) = cache(Duration::from_secs(60));
        let ca = GroupCode::parse("CA").unwrap();

        cache.get_or_load(&ca).await.unwrap();
        cache.refresh(&ca).await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);

        assert!(cache.evict(&ca).await);
        assert!(!cache.evict(&ca).await);

        assert_eq!(cache.refresh_all().await.unwrap(), 1);
        assert_eq!(cache.groups_with_data().await.unwrap(), vec![ca]);
    }

    /// Holds CA loads until released; every other group loads at once.
    struct GatedSource {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl SurveySource for GatedSource {
        async fn load_group(&self, group: &GroupCode) -> Result<Option<RawSurvey>> {
            if group.as_str() == "CA" {
                self.started.notify_one();
                self.release.notified().await;
            }
            parse_survey(SAMPLE.as_bytes()).map(Some)
        }
    }

    #[tokio::test]
    async fn test_slow_load_leaves_other_groups_readable() {
        let source = Arc::new(GatedSource {
            started: Notify::new(),
            release: Notify::new(),
        });
        let cache = Arc::new(SurveyCache::new(source.clone(), Duration::from_secs(60)));
        let ca = GroupCode::parse("CA").unwrap();
        let tx = GroupCode::parse("TX").unwrap();
        cache.get_or_load(&tx).await.unwrap();

        let loading = tokio::spawn({
            let cache = Arc::clone(&cache);
            let ca = ca.clone();
            async move { cache.get_or_load(&ca).await }
        });
        source.started.notified().await;

        // CA is mid-load; TX reads and refreshes still go through
        let tx_survey = tokio::time::timeout(Duration::from_secs(5), cache.get_or_load(&tx))
            .await
            .expect("cached group blocked by another group's load")
            .unwrap();
        assert!(tx_survey.is_some());
        let refreshed = tokio::time::timeout(Duration::from_secs(5), cache.refresh(&tx))
            .await
            .expect("refresh blocked by another group's load")
            .unwrap();
        assert!(refreshed.is_some());

        source.release.notify_one();
        assert!(loading.await.unwrap().unwrap().is_some());
        assert!(cache.evict(&ca).await);
    }

    struct FailingSource {
        fail: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl SurveySource for FailingSource {
        async fn load_group(&self, _group: &GroupCode) -> Result<Option<RawSurvey>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(SurveyError::configuration("survey file unreadable"));
            }
            parse_survey(SAMPLE.as_bytes()).map(Some)
        }
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_old_entry() {
        let source = Arc::new(FailingSource {
            fail: std::sync::atomic::AtomicBool::new(false),
        });
        let cache = SurveyCache::new(source.clone(), Duration::from_secs(60));
        let ca = GroupCode::parse("CA").unwrap();
        cache.get_or_load(&ca).await.unwrap();

        source.fail.store(true, Ordering::SeqCst);
        assert!(cache.refresh(&ca).await.is_err());
        assert!(cache.get_or_load(&ca).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_resolve_errors() {
        let (_, cache) = cache(Duration::from_secs(60));
        assert!(matches!(
            cache.resolve("ZZ", "x", "All Facilities").await,
            Err(SurveyError::InvalidGroup { .. })
        ));
        assert!(matches!(
            cache.resolve("TX", "x", "All Facilities").await,
            Err(SurveyError::FacilityNotFound { .. })
        ));
        assert!(matches!(
            cache.resolve("CA", "nowhere", "All Facilities").await,
            Err(SurveyError::FacilityNotFound { .. })
        ));

        let (code, facility, dataset, configuration) = cache
            .resolve("ca", "valleyclinic", "All Facilities")
            .await
            .unwrap();
        assert_eq!(code.as_str(), "CA");
        assert_eq!(facility.name, "Valley Clinic");
        assert_eq!(dataset.row_count(), 1);
        assert_eq!(configuration.group(), "CA");
    }

    #[tokio::test]
    async fn test_csv_source_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("CA.csv"), SAMPLE).unwrap();
        let source = CsvSurveySource::new(dir.path());

        let ca = GroupCode::parse("CA").unwrap();
        let survey = source.load_group(&ca).await.unwrap().unwrap();
        assert_eq!(survey.dataset.row_count(), 3);

        let tx = GroupCode::parse("TX").unwrap();
        assert!(source.load_group(&tx).await.unwrap().is_none());
    }
}
