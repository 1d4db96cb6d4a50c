//! Course recommendations and course material.
//!
//! Recommendations are derived from the ranked [`Diagnostics`]: the two most urgent
//! tactical tags, the most frequent structure and the most frequent opening each become
//! one [`CourseRecommendation`], ranked again by urgency.
//!
//! Course material comes from fixed templates (isolated queen pawn, hanging pawns) or a
//! generic one-lesson skeleton. A [`TextGenerator`], when given, adds free-text coaching
//! notes on top; without one the template is returned unchanged.
//!
//! Adaptive courses reuse the player's own training items as worked examples.

use std::{convert::Infallible, fmt, str::FromStr};

use oxicoach_board::Move;
use oxicoach_tactics::{motif::MotifTag, structure::StructureTag};
use serde::{Deserialize, Serialize};

use crate::{
    diagnostics::{Diagnostics, SignalKey},
    item::{ItemId, TrainingItem},
    text::{self, ChatMessage, TextGenerator},
};

/// What a course is about.
///
/// Written as `tactic:<tag>`, `structure:<archetype>` or `opening:<name>`; any other
/// string is a free-form general topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CourseTopic {
    Tactic(MotifTag),
    Structure(StructureTag),
    Opening(String),
    General(String),
}

impl CourseTopic {
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::Tactic(tag) => format!("Tactics: {}", tag.label()),
            Self::Structure(StructureTag::IsolatedQueenPawn) => "Isolated Queen Pawn (IQP)".to_owned(),
            Self::Structure(tag) => tag.label().to_owned(),
            Self::Opening(name) => format!("Opening: {name}"),
            Self::General(text) => text.clone(),
        }
    }

    /// Structure archetype the topic refers to, including free-form topics that name
    /// one of the templated structures.
    #[must_use]
    pub fn structure(&self) -> Option<StructureTag> {
        match self {
            Self::Structure(tag) => Some(*tag),
            Self::General(text) => {
                let text = text.to_lowercase();
                if text.contains("iqp") || text.contains("isolated") {
                    Some(StructureTag::IsolatedQueenPawn)
                } else if text.contains("hanging") {
                    Some(StructureTag::HangingPawns)
                } else {
                    None
                }
            }
            Self::Tactic(_) | Self::Opening(_) => None,
        }
    }

    fn example_note(&self) -> String {
        match self {
            Self::Tactic(tag) => format!("Motif '{tag}'"),
            Self::Structure(tag) => format!("Your mistake in a position with {}", tag.label()),
            Self::Opening(name) => format!("Typical error in the {name}"),
            Self::General(_) => "General example from your mistakes".to_owned(),
        }
    }
}

impl fmt::Display for CourseTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tactic(tag) => write!(f, "tactic:{tag}"),
            Self::Structure(tag) => write!(f, "structure:{tag}"),
            Self::Opening(name) => write!(f, "opening:{name}"),
            Self::General(text) => f.write_str(text),
        }
    }
}

impl FromStr for CourseTopic {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let topic = match s.split_once(':') {
            Some(("tactic", tag)) => tag
                .trim()
                .parse()
                .map_or_else(|_| Self::General(s.to_owned()), Self::Tactic),
            Some(("structure", tag)) => tag
                .trim()
                .parse()
                .map_or_else(|_| Self::General(s.to_owned()), Self::Structure),
            Some(("opening", name)) if !name.trim().is_empty() => {
                Self::Opening(name.trim().to_owned())
            }
            _ => Self::General(s.to_owned()),
        };
        Ok(topic)
    }
}

impl From<String> for CourseTopic {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(topic) => topic,
            Err(never) => match never {},
        }
    }
}

impl From<CourseTopic> for String {
    fn from(topic: CourseTopic) -> Self {
        topic.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecommendation {
    pub topic: CourseTopic,
    pub title: String,
    pub urgency: f64,
    pub minutes: u32,
    pub rationale: String,
    /// Keys of the signals this recommendation came from.
    pub source_keys: Vec<String>,
}

const RECOMMENDED_TACTICS: usize = 2;
const HIGH_URGENCY: f64 = 0.6;

/// Turns the diagnostic ranking into at most `max` course recommendations, most urgent
/// first.
#[must_use]
pub fn recommend_courses(diagnostics: &Diagnostics, max: usize) -> Vec<CourseRecommendation> {
    let mut recommendations = Vec::new();

    for signal in diagnostics.signals_in("tactics").take(RECOMMENDED_TACTICS) {
        let SignalKey::Tactics(tag) = signal.key else {
            continue;
        };
        let topic = CourseTopic::Tactic(tag);
        recommendations.push(CourseRecommendation {
            title: topic.title(),
            topic,
            urgency: signal.score,
            minutes: if signal.score > HIGH_URGENCY { 20 } else { 15 },
            rationale: format!("Build consistency on '{tag}'; your solve rate there can improve."),
            source_keys: vec![signal.key.to_string()],
        });
    }

    let top_structure = diagnostics.signals_in("structure").find_map(|signal| match signal.key {
        SignalKey::Structure(tag) => Some((tag, signal)),
        _ => None,
    });
    if let Some((tag, signal)) = top_structure {
        let topic = CourseTopic::Structure(tag);
        recommendations.push(CourseRecommendation {
            title: topic.title(),
            topic,
            urgency: signal.score,
            minutes: if signal.score > HIGH_URGENCY { 40 } else { 30 },
            rationale: "A frequent structure in your games; knowing its plans gains points quickly."
                .to_owned(),
            source_keys: vec![signal.key.to_string()],
        });
    }

    let top_opening = diagnostics.signals_in("opening").find_map(|signal| match &signal.key {
        SignalKey::Opening(name) => Some((name, signal)),
        _ => None,
    });
    if let Some((name, signal)) = top_opening {
        let topic = CourseTopic::Opening(name.clone());
        recommendations.push(CourseRecommendation {
            title: topic.title(),
            topic,
            urgency: signal.score,
            minutes: 25,
            rationale: "Your most played opening: plans and critical lines.".to_owned(),
            source_keys: vec![signal.key.to_string()],
        });
    }

    recommendations.sort_by(|a, b| b.urgency.total_cmp(&a.urgency));
    recommendations.truncate(max);
    recommendations
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub title: String,
    pub objectives: Vec<String>,
    pub key_ideas: Vec<String>,
    pub common_mistakes: Vec<String>,
    pub mini_quiz: Vec<String>,
}

impl Lesson {
    fn new(
        title: &str,
        objectives: &[&str],
        key_ideas: &[&str],
        common_mistakes: &[&str],
        mini_quiz: &[&str],
    ) -> Self {
        let owned = |lines: &[&str]| -> Vec<String> { lines.iter().map(|&line| line.to_owned()).collect() };
        Self {
            title: title.to_owned(),
            objectives: owned(objectives),
            key_ideas: owned(key_ideas),
            common_mistakes: owned(common_mistakes),
            mini_quiz: owned(mini_quiz),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub topic: CourseTopic,
    pub title: String,
    pub subtitle: String,
    pub estimated_minutes: u32,
    pub lessons: Vec<Lesson>,
    pub references: Vec<String>,
    pub structure: Option<StructureTag>,
    /// Generated coaching notes, if a text generator was available.
    pub notes: Option<String>,
}

fn isolated_queen_pawn_course(topic: CourseTopic) -> Course {
    Course {
        topic,
        title: "Isolated Queen Pawn (IQP)".to_owned(),
        subtitle: "Plans, key squares, defence and practice".to_owned(),
        estimated_minutes: 40,
        lessons: vec![
            Lesson::new(
                "What the isolated queen pawn is and why it matters",
                &["Recognize the IQP", "Dynamic assets versus static weakness"],
                &[
                    "The IQP gives open lines and activity in exchange for a fixed weakness.",
                    "The square in front of the pawn (d5/d4) is the blockade point.",
                    "If the attack stalls, the endgame usually favours the defender.",
                ],
                &[
                    "Trading too many pieces while holding the IQP.",
                    "Pushing the pawn without preparation.",
                ],
                &[
                    "Which square is blockaded against the IQP?",
                    "Which side usually welcomes trades into an endgame?",
                ],
            ),
            Lesson::new(
                "Typical plans for the side with the IQP",
                &["Piece placement", "When to attack"],
                &[
                    "Rooks on the e- and c-files, queen on e2, bishop on d3 or c2.",
                    "Knight to e5 or c5 depending on the structure.",
                    "Look for activity; avoid simplifying without compensation.",
                ],
                &["Attacking without opening lines", "Ignoring transitions to the endgame"],
                &["Name two typical rook placements with the IQP."],
            ),
            Lesson::new(
                "Defending against the IQP",
                &["Blockade", "Simplification", "Winning the pawn"],
                &[
                    "Blockade d5/d4 with a stable piece.",
                    "Trade minor pieces when your position is coordinated.",
                    "Take the pawn once the active side loses the initiative.",
                ],
                &["Capturing too early", "Allowing a freeing break"],
                &["What happens if you capture the IQP too early?"],
            ),
            Lesson::new(
                "Exercises from your games",
                &["Turn mistakes into rules", "Apply them in three typical positions"],
                &[
                    "Review positions: before the push, before a sacrifice, at the endgame transition.",
                    "Write down two personal rules to repeat.",
                ],
                &["Analysing without a goal"],
                &["Write two personal rules for the IQP."],
            ),
        ],
        references: vec!["Tarrasch Defense, Panov Attack, QGD Exchange".to_owned()],
        structure: Some(StructureTag::IsolatedQueenPawn),
        notes: None,
    }
}

fn hanging_pawns_course(topic: CourseTopic) -> Course {
    Course {
        topic,
        title: "Hanging Pawns".to_owned(),
        subtitle: "When to advance, when to hold, and how to defend".to_owned(),
        estimated_minutes: 30,
        lessons: vec![
            Lesson::new(
                "Hanging pawns: definition and evaluation",
                &["Recognize the structure", "Understand advance versus blockade"],
                &[
                    "Pawns on c and d without support from b or e.",
                    "Strong when they can advance, weak once blockaded.",
                ],
                &["Advancing without support", "Allowing a permanent blockade"],
                &["What is the typical defensive plan against hanging pawns?"],
            ),
            Lesson::new(
                "Advancing (c5/d5) and pawn breaks",
                &["Choose the moment", "Coordinate the pieces"],
                &[
                    "Prepare with pieces behind the advance.",
                    "After advancing, look for activity and open files.",
                ],
                &["Advancing uncoordinated"],
                &["What tells you it is a good moment to advance?"],
            ),
            Lesson::new(
                "Playing against hanging pawns",
                &["Blockade", "Piece pressure on the pawns", "Simplification"],
                &["Blockade the key squares.", "Attack the pawns with pieces and rooks."],
                &["Trading off the blockader"],
                &["Which piece is usually the best blockader?"],
            ),
        ],
        references: vec!["QGD, Nimzo-Indian, Catalan (structures after cxd)".to_owned()],
        structure: Some(StructureTag::HangingPawns),
        notes: None,
    }
}

fn generic_course(topic: CourseTopic) -> Course {
    Course {
        title: topic.title(),
        topic,
        subtitle: "Template course, extended with your games".to_owned(),
        estimated_minutes: 25,
        lessons: vec![Lesson::new(
            "Introduction",
            &["Understand the theme", "Spot it in your own games"],
            &["We will turn it into actionable rules."],
            &["Not noting down critical decisions"],
            &["What exactly do you want to improve with this theme?"],
        )],
        references: Vec::new(),
        structure: None,
        notes: None,
    }
}

const COACH_PERSONA: &str = "You are a chess coach. Be concrete.";

/// Builds the course for `topic`, adding generated notes when `generator` is given and
/// answers.
#[must_use]
pub fn generate_course(topic: &CourseTopic, generator: Option<&mut dyn TextGenerator>) -> Course {
    let mut course = match topic.structure() {
        Some(StructureTag::IsolatedQueenPawn) => isolated_queen_pawn_course(topic.clone()),
        Some(StructureTag::HangingPawns) => hanging_pawns_course(topic.clone()),
        _ => generic_course(topic.clone()),
    };
    let messages = [
        ChatMessage::system(COACH_PERSONA),
        ChatMessage::user(format!(
            "Give 5 practical rules and 3 typical mistakes about: {}. Format: bullet points.",
            course.title
        )),
    ];
    course.notes = text::try_generate(generator, &messages, 0.3);
    course
}

/// One of the player's own positions used as a worked example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseExample {
    pub item_id: ItemId,
    pub game_id: String,
    pub ply: usize,
    pub fen: String,
    pub played: Move,
    pub best: Move,
    pub tags: Vec<MotifTag>,
    pub swing_cp: i32,
    pub note: String,
}

impl CourseExample {
    #[must_use]
    pub fn from_item(item: &TrainingItem, note: String) -> Self {
        Self {
            item_id: item.id,
            game_id: item.game_id.clone(),
            ply: item.ply,
            fen: item.fen_before.clone(),
            played: item.played,
            best: item.best,
            tags: item.tags.iter().collect(),
            swing_cp: item.swing_cp,
            note,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptiveCourse {
    pub course: Course,
    pub examples: Vec<CourseExample>,
}

/// Builds a three-lesson course around `items`, the player's own positions on `topic`.
#[must_use]
pub fn adaptive_course(
    username: &str,
    topic: &CourseTopic,
    items: &[TrainingItem],
    generator: Option<&mut dyn TextGenerator>,
) -> AdaptiveCourse {
    let note = topic.example_note();
    let examples: Vec<_> = items
        .iter()
        .map(|item| CourseExample::from_item(item, note.clone()))
        .collect();

    let lessons = vec![
        Lesson::new(
            "Quick diagnosis: your pattern",
            &["Understand what is costing you points", "Turn it into an actionable rule"],
            &["We use your real positions, not generic theory."],
            &["Playing fast without a checklist", "Missing the critical moment"],
            &["What was your first candidate here, and why?"],
        ),
        Lesson::new(
            "Rules and checklist",
            &["Write 3 to 5 rules", "Apply them under pressure"],
            &["A 20-30 second checklist before the critical move."],
            &["Looking for tactics that are not there", "Ignoring the opponent's threats"],
            &["Write your checklist (3 items)."],
        ),
        Lesson::new(
            "Exercises from your games",
            &["Solve 4 to 6 of your own positions", "Compare with the best line"],
            &["Spaced repetition: today, in 2 days, in 7 days."],
            &["Solving without calculating lines", "Not checking the opponent's resources"],
            &["Which defensive resource did the opponent have in example 1?"],
        ),
    ];

    let mut listing = String::new();
    for (i, example) in examples.iter().enumerate() {
        let tags: Vec<_> = example.tags.iter().map(|tag| tag.as_str()).collect();
        listing.push_str(&format!(
            "{}) FEN: {} | move: {} | best: {} | tags: {} | swing: {}\n",
            i + 1,
            example.fen,
            example.played,
            example.best,
            tags.join(","),
            example.swing_cp,
        ));
    }
    let messages = [
        ChatMessage::system(COACH_PERSONA),
        ChatMessage::user(format!(
            "Write a mini-lesson for this student based on their own positions.\n\
             Topic: {}\nStudent: {username}\n\
             Return: 5 short practical rules, 3 typical mistakes inferred from the examples, \
             a 20-second checklist, and for the first two examples the correct plan in 4-6 lines.\n\
             Use only the listed examples.\n\nEXAMPLES:\n{listing}",
            topic.title()
        )),
    ];

    let course = Course {
        topic: topic.clone(),
        title: topic.title(),
        subtitle: format!("Adaptive course for {username}, built from your games"),
        estimated_minutes: 40,
        lessons,
        references: vec![
            "Your own games with engine analysis".to_owned(),
            "Spaced repetition".to_owned(),
        ],
        structure: topic.structure(),
        notes: text::try_generate(generator, &messages, 0.25),
    };
    AdaptiveCourse { course, examples }
}

#[cfg(test)]
mod tests {
    use oxicoach_tactics::structure::StructureReport;

    use super::*;
    use crate::{
        diagnostics::{DiagnosticAggregator, OpeningStat},
        item::test_util::item,
        tag_stats::{TagRecord, TagStats},
        text::test_util::{CannedGenerator, OfflineGenerator},
    };

    #[test]
    fn test_topic_round_trip_and_fallback() {
        for text in ["tactic:fork", "structure:hanging_pawns", "opening:Italian Game", "endgames"] {
            let topic: CourseTopic = text.parse().unwrap();
            assert_eq!(topic.to_string(), text);
        }
        assert_eq!(
            "tactic:windmill".parse::<CourseTopic>().unwrap(),
            CourseTopic::General("tactic:windmill".to_owned())
        );
        assert_eq!(
            CourseTopic::General("IQP middlegames".to_owned()).structure(),
            Some(StructureTag::IsolatedQueenPawn)
        );
    }

    #[test]
    fn test_recommendations_follow_urgency() {
        let stats = TagStats::default()
            .with(MotifTag::Fork, TagRecord::new(10, 2))
            .with(MotifTag::Pin, TagRecord::new(10, 6))
            .with(MotifTag::Check, TagRecord::new(10, 9));
        let mut structures = StructureReport::default();
        structures.counts.insert(StructureTag::Carlsbad, 1);
        let openings = [OpeningStat {
            opening: "Italian Game".to_owned(),
            count: 3,
        }];
        let diag = DiagnosticAggregator::default().aggregate("alice", &stats, &structures, Some(&openings));

        let recs = recommend_courses(&diag, 6);
        let topics: Vec<String> = recs.iter().map(|r| r.topic.to_string()).collect();
        // carlsbad 1.0, opening 1.0, fork 0.8, pin 0.4
        assert_eq!(
            topics,
            ["structure:carlsbad", "opening:Italian Game", "tactic:fork", "tactic:pin"]
        );
        let minutes: Vec<u32> = recs.iter().map(|r| r.minutes).collect();
        assert_eq!(minutes, [40, 25, 20, 15]);
        assert_eq!(recs[2].source_keys, ["tactics.fork"]);

        assert_eq!(recommend_courses(&diag, 2).len(), 2);
    }

    #[test]
    fn test_templates_and_generated_notes() {
        let iqp = generate_course(&CourseTopic::Structure(StructureTag::IsolatedQueenPawn), None);
        assert_eq!(iqp.lessons.len(), 4);
        assert_eq!(iqp.estimated_minutes, 40);
        assert_eq!(iqp.notes, None);

        let mut generator = CannedGenerator {
            reply: "- keep the blockader".to_owned(),
            ..CannedGenerator::default()
        };
        let hanging = generate_course(&CourseTopic::Structure(StructureTag::HangingPawns), Some(&mut generator));
        assert_eq!(hanging.lessons.len(), 3);
        assert_eq!(hanging.notes.as_deref(), Some("- keep the blockader"));
        let (messages, temperature) = &generator.requests[0];
        assert!(messages[1].content.contains("Hanging Pawns"));
        assert!((temperature - 0.3).abs() < f32::EPSILON);

        let generic = generate_course(&CourseTopic::Tactic(MotifTag::Pin), Some(&mut OfflineGenerator));
        assert_eq!(generic.title, "Tactics: Pin");
        assert_eq!(generic.estimated_minutes, 25);
        assert_eq!(generic.notes, None);
    }

    #[test]
    fn test_adaptive_course_uses_own_positions() {
        let items = [
            item(1, "g1", 12, 400, &[MotifTag::Fork]),
            item(2, "g2", 30, 300, &[MotifTag::Fork, MotifTag::Check]),
        ];
        let mut generator = CannedGenerator {
            reply: "notes".to_owned(),
            ..CannedGenerator::default()
        };
        let topic = CourseTopic::Tactic(MotifTag::Fork);
        let adaptive = adaptive_course("alice", &topic, &items, Some(&mut generator));

        assert_eq!(adaptive.examples.len(), 2);
        assert_eq!(adaptive.examples[1].tags, [MotifTag::Check, MotifTag::Fork]);
        assert_eq!(adaptive.examples[0].note, "Motif 'fork'");
        assert_eq!(adaptive.course.lessons.len(), 3);
        assert_eq!(adaptive.course.subtitle, "Adaptive course for alice, built from your games");
        assert_eq!(adaptive.course.notes.as_deref(), Some("notes"));
        let prompt = &generator.requests[0].0[1].content;
        assert!(prompt.contains("2) FEN:"));
        assert!(prompt.contains("tags: check,fork"));
    }
}
