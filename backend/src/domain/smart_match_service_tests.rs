//! Tests for the smart match service.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use mockable::Clock;
use rstest::{fixture, rstest};

use super::SmartMatchService;
use crate::domain::ports::{MatchModel, MatchModelError, MockMatchModel};
use crate::domain::smart_match::{
    MIN_RELEVANCE_SCORE, MatchError, MatchQuery, MatchValidationError, StaleReason,
};
use crate::domain::{PostingBoard, PostingDraft, PostingId, Role};
use crate::outbound::memory::InMemoryPostingRepository;
use crate::test_support::{MutableClock, ScriptedMatchModel};

fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

struct Board {
    board: Arc<PostingBoard<InMemoryPostingRepository>>,
    clock: Arc<MutableClock>,
}

impl Board {
    fn post(&self, owner: &str, role: Role, name: &str, until: Option<Duration>) -> PostingId {
        let now = self.clock.utc();
        self.board
            .create(
                PostingDraft::new(owner, role, name, "Misc")
                    .with_window(Some(now), until.map(|offset| now + offset)),
            )
            .expect("valid posting")
            .id()
    }

    fn service<M: MatchModel>(&self, model: M) -> SmartMatchService<InMemoryPostingRepository, M> {
        SmartMatchService::new(self.board.clone(), Arc::new(model), self.clock.clone())
    }

    fn query(&self, text: &str) -> MatchQuery {
        MatchQuery::new(text, Role::Borrower, self.clock.utc())
    }
}

#[fixture]
fn board() -> Board {
    let clock = Arc::new(MutableClock::new(fixture_timestamp()));
    Board {
        board: Arc::new(PostingBoard::new(
            InMemoryPostingRepository::default(),
            clock.clone(),
        )),
        clock,
    }
}

#[rstest]
#[tokio::test]
async fn accepted_matches_follow_model_order(board: Board) {
    let scientific = board.post("Alice", Role::Lender, "Scientific Calculator", Some(Duration::days(3)));
    let basic = board.post("Bob", Role::Lender, "Basic Calculator", Some(Duration::days(2)));
    board.post("Carl", Role::Borrower, "Calculator wanted", None);

    let model = ScriptedMatchModel::default().then_reply(format!(
        "Ranked:\n[{{\"id\":\"{basic}\",\"owner\":\"Bob\",\"rationale\":\"cheap\",\"score\":40}},\
         {{\"id\":\"{scientific}\",\"owner\":\"Alice\",\"rationale\":\"exam ready\",\"score\":95}}]"
    ));
    let service = board.service(model);

    let results = service
        .smart_match(board.query("Need a calculator for an exam"))
        .await
        .expect("matches accepted");

    let ids: Vec<PostingId> = results.iter().map(|result| result.posting.id()).collect();
    assert_eq!(ids, vec![basic, scientific]);
    assert_eq!(results[1].rationale, "exam ready");
}

#[rstest]
#[tokio::test]
async fn prompt_lists_only_complementary_active_candidates(board: Board) {
    let lender = board.post("Alice", Role::Lender, "Phone Charger", None);
    let withdrawn = board.post("Dana", Role::Lender, "Spare Charger", None);
    board.board.cancel(withdrawn).expect("cancel");
    board.post("Carl", Role::Borrower, "Need charger", None);

    let model = Arc::new(ScriptedMatchModel::default().then_reply("[]"));
    let service = SmartMatchService::new(board.board.clone(), model.clone(), board.clock.clone());

    let results = service
        .smart_match(board.query("Need a phone charger"))
        .await
        .expect("empty answer accepted");

    assert!(results.is_empty());
    let prompts = model.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Phone Charger"));
    assert!(prompts[0].contains(&format!("\"id\": \"{lender}\"")));
    assert!(!prompts[0].contains("Spare Charger"));
    assert!(!prompts[0].contains("Need charger"));
}

#[rstest]
#[tokio::test]
async fn hallucinated_id_rejects_the_whole_batch(board: Board) {
    let real = board.post("Alice", Role::Lender, "Kettle", None);
    let model = ScriptedMatchModel::default().then_reply(format!(
        r#"[{{"id":"{real}","rationale":"boils","score":90}},{{"id":"999","rationale":"made up","score":99}}]"#
    ));

    let result = board.service(model).smart_match(board.query("kettle")).await;

    assert_eq!(
        result,
        Err(MatchError::Validation(
            MatchValidationError::UnknownPostingId {
                id: "999".to_owned()
            }
        ))
    );
}

#[rstest]
#[tokio::test]
async fn window_closing_during_the_model_call_is_stale(board: Board) {
    let id = board.post("Alice", Role::Lender, "Calculator", Some(Duration::milliseconds(1)));
    let until = board.clock.utc() + Duration::milliseconds(1);

    let clock = board.clock.clone();
    let mut model = MockMatchModel::new();
    model.expect_complete().times(1).returning(move |_| {
        clock.advance_millis(5);
        Ok(r#"[{"id":"0","rationale":"fits","score":90}]"#.to_owned())
    });

    let result = board.service(model).smart_match(board.query("calculator")).await;

    assert_eq!(
        result,
        Err(MatchError::Validation(MatchValidationError::StalePosting {
            id,
            reason: StaleReason::WindowClosed { until },
        }))
    );
}

#[rstest]
#[tokio::test]
async fn low_score_rejects_the_whole_batch(board: Board) {
    let strong = board.post("Alice", Role::Lender, "Scientific Calculator", None);
    let weak = board.post("Bob", Role::Lender, "Broken Calculator", None);
    let model = ScriptedMatchModel::default().then_reply(format!(
        r#"[{{"id":"{strong}","score":88}},{{"id":"{weak}","rationale":"broken","score":"12"}}]"#
    ));

    let result = board.service(model).smart_match(board.query("calculator")).await;

    assert_eq!(
        result,
        Err(MatchError::Validation(
            MatchValidationError::BelowRelevanceThreshold {
                id: weak,
                score: 12.0,
                minimum: MIN_RELEVANCE_SCORE,
            }
        ))
    );
}

#[rstest]
#[case::prose("Sorry, nothing fits that request.")]
#[case::truncated(r#"[{"id":"0","rationale":"fits","score":9"#)]
#[tokio::test]
async fn unusable_reply_yields_no_matches(board: Board, #[case] reply: &str) {
    board.post("Alice", Role::Lender, "Kettle", None);
    let model = ScriptedMatchModel::default().then_reply(reply);

    let results = board
        .service(model)
        .smart_match(board.query("kettle"))
        .await
        .expect("soft failure");

    assert!(results.is_empty());
}

#[rstest]
#[tokio::test]
async fn model_failures_propagate_unchanged(board: Board) {
    board.post("Alice", Role::Lender, "Kettle", None);
    let model = ScriptedMatchModel::default()
        .then_fail(MatchModelError::rate_limited("quota exhausted"));

    let result = board.service(model).smart_match(board.query("kettle")).await;

    assert_eq!(
        result,
        Err(MatchError::Model(MatchModelError::rate_limited(
            "quota exhausted"
        )))
    );
}

#[rstest]
#[tokio::test]
async fn empty_candidate_set_skips_the_model(board: Board) {
    board.post("Carl", Role::Borrower, "Need charger", None);
    let mut model = MockMatchModel::new();
    model.expect_complete().never();

    let results = board
        .service(model)
        .smart_match(board.query("charger"))
        .await
        .expect("no candidates");

    assert!(results.is_empty());
}

#[rstest]
#[tokio::test]
async fn selection_expires_lapsed_postings_before_prompting(board: Board) {
    let lapsed = board.post("Alice", Role::Lender, "Old Kettle", Some(Duration::minutes(1)));
    board.post("Bob", Role::Lender, "New Kettle", None);
    board.clock.advance_minutes(5);

    let model = Arc::new(ScriptedMatchModel::default().then_reply("[]"));
    let service = SmartMatchService::new(board.board.clone(), model.clone(), board.clock.clone());
    service
        .smart_match(board.query("kettle"))
        .await
        .expect("empty answer accepted");

    assert!(!model.prompts()[0].contains("Old Kettle"));
    assert_eq!(
        board.board.get(lapsed).expect("stored").status(),
        crate::domain::PostingStatus::Expired
    );
}
