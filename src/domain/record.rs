//! Question/answer records produced by extraction.

use std::num::NonZeroU32;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::item::{format_date, SourceItem};

/// Results file columns, in persisted order
pub const RESULT_COLUMNS: [&str; 8] = [
    "date",
    "title",
    "youtube_link",
    "youtube_id",
    "question_number",
    "question",
    "answer",
    "conversation",
];

/// One question as returned by the extraction collaborator.
///
/// Not validated; `QaRecord::from_triple` rejects a zero question number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaTriple {
    pub question_number: u32,
    pub question: String,
    pub answer: String,
}

impl QaTriple {
    pub fn new(
        question_number: u32,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            question_number,
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Human,
    /// Assistant role, named the way chat datasets name it
    Gpt,
}

/// A single conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub from: Speaker,
    pub value: String,
}

/// Two-turn exchange derived from a question and its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation(pub Vec<Turn>);

impl Conversation {
    pub fn from_qa(question: &str, answer: &str) -> Self {
        Self(vec![
            Turn {
                from: Speaker::Human,
                value: question.to_string(),
            },
            Turn {
                from: Speaker::Gpt,
                value: answer.to_string(),
            },
        ])
    }

    /// JSON form stored in the `conversation` column (non-ASCII kept verbatim)
    pub fn to_json(&self) -> String {
        // A Vec of plain structs always serializes
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn parse(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// One row of the results log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaRecord {
    pub date: Option<NaiveDate>,
    pub title: String,
    pub youtube_link: String,
    pub youtube_id: String,
    /// 1-based
    pub question_number: NonZeroU32,
    pub question: String,
    pub answer: String,
    pub conversation: Conversation,
}

impl QaRecord {
    /// Build a record for `item` from one extracted triple, or `None` when
    /// the question number is zero
    pub fn from_triple(item: &SourceItem, triple: QaTriple) -> Option<Self> {
        let question_number = NonZeroU32::new(triple.question_number)?;
        let conversation = Conversation::from_qa(&triple.question, &triple.answer);
        Some(Self {
            date: item.date,
            title: item.title.clone(),
            youtube_link: item.url.clone(),
            youtube_id: item.id.clone(),
            question_number,
            question: triple.question,
            answer: triple.answer,
            conversation,
        })
    }

    /// Row in `RESULT_COLUMNS` order
    pub fn to_row(&self) -> Vec<String> {
        vec![
            format_date(self.date),
            self.title.clone(),
            self.youtube_link.clone(),
            self.youtube_id.clone(),
            self.question_number.to_string(),
            self.question.clone(),
            self.answer.clone(),
            self.conversation.to_json(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_json_shape() {
        let conv = Conversation::from_qa("台灣最高的山？", "玉山");
        let json = conv.to_json();

        assert_eq!(
            json,
            r#"[{"from":"human","value":"台灣最高的山？"},{"from":"gpt","value":"玉山"}]"#
        );
        assert_eq!(Conversation::parse(&json).unwrap(), conv);
    }

    #[test]
    fn test_record_row_order() {
        let item = SourceItem {
            id: "v2".into(),
            url: "https://www.youtube.com/watch?v=v2".into(),
            title: "Episode 2".into(),
            date: NaiveDate::from_ymd_opt(2023, 5, 4),
            uploader: "Channel".into(),
        };
        let record = QaRecord::from_triple(&item, QaTriple::new(3, "Q", "A")).unwrap();
        let row = record.to_row();

        assert_eq!(row.len(), RESULT_COLUMNS.len());
        assert_eq!(row[0], "2023-05-04");
        assert_eq!(row[2], item.url);
        assert_eq!(row[3], "v2");
        assert_eq!(row[4], "3");
        assert_eq!(row[7], Conversation::from_qa("Q", "A").to_json());
    }

    #[test]
    fn test_zero_question_number_rejected() {
        let item = SourceItem {
            id: "v1".into(),
            url: "https://www.youtube.com/watch?v=v1".into(),
            title: "Episode 1".into(),
            date: None,
            uploader: String::new(),
        };

        assert!(QaRecord::from_triple(&item, QaTriple::new(0, "Q", "A")).is_none());
        assert!(QaRecord::from_triple(&item, QaTriple::new(1, "Q", "A")).is_some());
    }
}
