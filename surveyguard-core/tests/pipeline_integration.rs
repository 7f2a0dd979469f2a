//! End-to-end pipeline tests over CSV survey files.
//!
//! This test suite covers:
//! - Facility listing and resolution through the survey cache
//! - Reconciliation, date handling and anonymization of a facility subset
//! - Feedback censoring with withheld responses
//! - Word statistics and sentiment ordering over censored feedback
//! - Report serialization
//! - Cache refresh after the survey file changes

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use surveyguard_core::{
    Capabilities, CsvSurveySource, EntityDetector, EntitySpan, FacilityPipeline, PipelineConfig,
    ReportOptions, Result, SentimentDimension, SentimentScorer, SentimentScores, SnowballStemmer,
    SurveyCache, SurveyError, models::PREFER_NOT_TO_ANSWER,
};
use tempfile::TempDir;

const SURVEY: &str = "\
ResponseId;site;StartDate;Q1;Q2;Q3;Q4;Q5;Q6;Q7;Q7_TEXT;Q8;Q8;Q9
Response ID;Site;Start date;Did you attend a huddle?;Age;Insurance;Race;Education;Gender;How was your visit?;How was your visit? - Other;Duplicate;Duplicate;Any other comments?
info;site_name;date;huddle;age;insurance;race;education;demographics;question;question;question;question;open_feedback
R1;North Clinic;2023-01-05 10:00;Yes;23;Medicare;White;College;Female;Good;;a;b;Dr. Alice Brown was very kind
R2;North Clinic;2023-01-20;Yes;27;Medicare;White;College;Male;Good;;a;b;
R3;North Clinic;2023-02-03;No;31;Medicaid;Black;High school;Female;Excellent;;a;b;Long wait in the lobby
R4;North Clinic;2023-02-14;Yes;35;Medicaid;Black;High school;Female;Good;;a;b;
R5;North Clinic;2023-04-01;No;38;Private;White;College;Male;Poor;;a;b;FAIL this one
R6;North Clinic;03/15/2023;Yes;42;Private;Asian;College;Female;Good;;a;b;Waiting was short
R7;North Clinic;not a date;Yes;45;Medicare;White;Prefers not to answer;Male;other;typed;a;b;
R8;North Clinic;2023-04-22;No;;Medicaid;Black;High school;Female;Good;;a;b;Great nurses
R9;South Clinic;2023-01-09;Yes;51;Medicare;White;College;Female;Good;;a;b;
R10;South Clinic;2023-01-10;Yes;56;Medicare;White;College;Female;Good;;a;b;Parking was hard
R11;South Clinic;2023-03-02;No;62;Private;Black;College;Male;Good;;a;b;
R12;South Clinic;2023-03-03;Yes;67;Private;White;College;Male;Good;;a;b;
";

/// Flags fixed names as entities and fails on text containing "FAIL".
struct NameListDetector;

#[async_trait]
impl EntityDetector for NameListDetector {
    async fn detect(&self, text: &str) -> Result<Vec<EntitySpan>> {
        if text.contains("FAIL") {
            return Err(SurveyError::capability("entity detection", "model unavailable"));
        }
        let mut spans: Vec<EntitySpan> = ["Alice", "Brown"]
            .iter()
            .flat_map(|name| {
                text.match_indices(name)
                    .map(|(start, found)| EntitySpan::entity(start, start + found.len()))
            })
            .collect();
        spans.sort_by_key(|span| span.start);
        Ok(spans)
    }
}

/// Likes "kind" and "Great", fails on "lobby".
struct KeywordScorer;

#[async_trait]
impl SentimentScorer for KeywordScorer {
    async fn score(&self, text: &str) -> Result<SentimentScores> {
        if text.contains("lobby") {
            return Err(SurveyError::capability("sentiment scoring", "rejected"));
        }
        let positive = if text.contains("kind") || text.contains("Great") {
            0.9
        } else {
            0.1
        };
        Ok(SentimentScores {
            negative: 1.0 - positive,
            neutral: 0.0,
            positive,
        })
    }
}

fn capabilities() -> Capabilities {
    Capabilities::new(
        Arc::new(NameListDetector),
        Arc::new(SnowballStemmer::new()),
        Arc::new(KeywordScorer),
    )
}

fn config() -> PipelineConfig {
    PipelineConfig::default()
        .with_min_k(3)
        .with_capability_timeout(Duration::from_secs(5))
}

fn survey_dir() -> (TempDir, SurveyCache) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("CA.csv"), SURVEY).unwrap();
    let cache = SurveyCache::new(
        Arc::new(CsvSurveySource::new(dir.path())),
        Duration::from_secs(60),
    );
    (dir, cache)
}

async fn north_clinic(cache: &SurveyCache) -> FacilityPipeline {
    FacilityPipeline::build(cache, "CA", "northclinic", capabilities(), config())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_integration_facility_listing() {
    let (_dir, cache) = survey_dir();

    let facilities = cache.facilities("ca", "All Facilities").await.unwrap();
    let slugs: Vec<&str> = facilities.iter().map(|f| f.slug.as_str()).collect();
    assert_eq!(slugs, vec!["allfacilities", "northclinic", "southclinic"]);
    assert_eq!(facilities[1].display_name, "NORTH CLINIC");

    let groups = cache.groups_with_data().await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].as_str(), "CA");
}

#[tokio::test]
async fn test_integration_resolution_failures() {
    let (_dir, cache) = survey_dir();

    let result = FacilityPipeline::build(&cache, "ZZ", "northclinic", capabilities(), config()).await;
    assert!(matches!(result, Err(SurveyError::InvalidGroup { .. })));

    let result = FacilityPipeline::build(&cache, "TX", "northclinic", capabilities(), config()).await;
    assert!(matches!(result, Err(SurveyError::FacilityNotFound { .. })));

    let result = FacilityPipeline::build(&cache, "CA", "eastclinic", capabilities(), config()).await;
    assert!(matches!(result, Err(SurveyError::FacilityNotFound { .. })));
}

#[tokio::test]
async fn test_integration_reconciliation() {
    let (_dir, cache) = survey_dir();
    let pipeline = north_clinic(&cache).await;
    let dataset = pipeline.dataset();

    assert!(!dataset.contains("ResponseId"));
    assert!(!dataset.contains("Q7_TEXT"));
    assert!(!dataset.contains("Q8"));
    assert!(!pipeline.configuration().contains("Q8"));
    assert!(dataset.contains("Year-Month"));

    assert!(
        pipeline
            .warnings()
            .iter()
            .any(|w| w == "Duplicate question ID: Q8. The question will be deleted.")
    );
    assert!(
        pipeline
            .warnings()
            .iter()
            .any(|w| w == "1 dates in column StartDate could not be read and were left empty.")
    );
}

#[tokio::test]
async fn test_integration_analytics() {
    let (_dir, cache) = survey_dir();
    let pipeline = north_clinic(&cache).await;
    let analytics = pipeline.analytics();

    assert_eq!(analytics.total_surveys(), 8);
    assert_eq!(analytics.start_date().as_deref(), Some("1/5/2023"));
    assert_eq!(analytics.end_date().as_deref(), Some("4/22/2023"));

    let trend: Vec<(String, usize)> = analytics.survey_trend_by_month().into_iter().collect();
    assert_eq!(
        trend,
        vec![
            ("2023-01".to_string(), 2),
            ("2023-02".to_string(), 2),
            ("2023-03".to_string(), 1),
            ("2023-04".to_string(), 2),
        ]
    );

    let huddle = analytics.huddle_sumup().unwrap();
    assert_eq!(huddle.yes, 62.5);
    assert_eq!(huddle.no, 37.5);

    let visit = analytics.multiple_choice("Q7").unwrap();
    let good = visit.iter().find(|a| a.answer == "Good").unwrap();
    assert_eq!(good.count, 5);
    assert!(visit.iter().any(|a| a.answer == "Other" && a.count == 1));

    assert!(analytics.multiple_choice("Q9").is_none());
}

#[tokio::test]
async fn test_integration_anonymization() {
    let (_dir, cache) = survey_dir();
    let pipeline = north_clinic(&cache).await;
    let analytics = pipeline.analytics();

    // Asian appears once and is merged
    let race = analytics.multiple_choice("Q4").unwrap();
    assert!(race.iter().all(|a| a.answer != "Asian"));
    assert!(race.iter().any(|a| a.answer == "White" && a.count == 4));
    assert!(race.iter().any(|a| a.answer == "Black" && a.count == 3));

    // Private insurance appears twice and is merged
    let insurance = analytics.multiple_choice("Q3").unwrap();
    assert!(insurance.iter().all(|a| a.answer != "Private"));
    assert!(insurance.iter().any(|a| a.answer == "Other" && a.count == 2));

    let education = analytics.multiple_choice("Q5").unwrap();
    assert!(
        education
            .iter()
            .any(|a| a.answer == PREFER_NOT_TO_ANSWER && a.count == 1)
    );

    // Ages 23 to 45 only meet the threshold as a single range
    assert_eq!(
        pipeline.configuration().answer_list("Q2"),
        ["0-50".to_string(), PREFER_NOT_TO_ANSWER.to_string()]
    );
    let ages = analytics.multiple_choice("Q2").unwrap();
    assert!(ages.iter().any(|a| a.answer == "0-50" && a.count == 7));
    assert!(ages.iter().any(|a| a.answer == PREFER_NOT_TO_ANSWER && a.count == 1));
}

#[tokio::test]
async fn test_integration_feedback_censoring() {
    let (_dir, cache) = survey_dir();
    let pipeline = north_clinic(&cache).await;

    assert_eq!(
        pipeline.errors(),
        ["Feedback to question Q9 in row 5 could not be censored and was withheld."]
    );

    let feedback = pipeline.feedback();
    let texts: Vec<&str> = feedback.items().iter().map(|i| i.censored.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Dr. _ _ was very kind",
            "Long wait in the lobby",
            "Waiting was short",
            "Great nurses",
        ]
    );
    assert!(pipeline.dataset().column("Q9").unwrap().cells[4].is_null());

    assert_eq!(feedback.top_words(1), vec!["wait"]);
    assert_eq!(feedback.word_count("wait"), 2);
    let rows: Vec<usize> = feedback
        .feedbacks_with_word("waiting")
        .iter()
        .map(|i| i.row)
        .collect();
    assert_eq!(rows, vec![2, 5]);
}

#[tokio::test]
async fn test_integration_sentiment_ordering() {
    let (_dir, cache) = survey_dir();
    let pipeline = north_clinic(&cache).await;

    let ordered = pipeline.sentiment_ordered(SentimentDimension::Positive).await;
    let rows: Vec<usize> = ordered.items.iter().map(|i| i.row).collect();
    assert_eq!(rows, vec![0, 7, 5, 2]);
    assert_eq!(
        ordered.errors,
        ["Sentiment of feedback to question Q9 in row 3 could not be scored."]
    );

    let ordered = pipeline.sentiment_ordered(SentimentDimension::Negative).await;
    let rows: Vec<usize> = ordered.items.iter().map(|i| i.row).collect();
    assert_eq!(rows, vec![5, 0, 7, 2]);
}

#[tokio::test]
async fn test_integration_report() {
    let (_dir, cache) = survey_dir();
    let pipeline =
        FacilityPipeline::build(&cache, "CA", "allfacilities", capabilities(), config())
            .await
            .unwrap();

    let report = pipeline
        .report(&ReportOptions {
            top_words: 5,
            sentiment: Some(SentimentDimension::Positive),
        })
        .await;
    assert_eq!(report.overview.total_surveys, 12);
    assert_eq!(report.feedback_responses, 5);
    assert!(report.questions.iter().any(|q| q.id == "Q4"));
    assert!(report.questions.iter().all(|q| q.id != "Q9"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["group_name"], "CALIFORNIA");
    assert_eq!(json["facility"]["slug"], "allfacilities");
    assert!(json["overview"]["huddle"]["Huddle Yes"].is_number());
    assert_eq!(json["sentiment"]["dimension"], "Positive");
}

#[tokio::test]
async fn test_integration_cache_refresh() {
    let (dir, cache) = survey_dir();
    let before = north_clinic(&cache).await;
    assert_eq!(before.analytics().total_surveys(), 8);

    let extra = "R13;North Clinic;2023-05-01;Yes;30;Medicare;White;College;Female;Good;;a;b;\n";
    std::fs::write(dir.path().join("CA.csv"), format!("{}{}", SURVEY, extra)).unwrap();

    // Still cached
    let cached = north_clinic(&cache).await;
    assert_eq!(cached.analytics().total_surveys(), 8);

    let group = surveyguard_core::GroupCode::parse("CA").unwrap();
    cache.refresh(&group).await.unwrap();
    let refreshed = north_clinic(&cache).await;
    assert_eq!(refreshed.analytics().total_surveys(), 9);
    assert_ne!(before.run_id(), refreshed.run_id());
}
