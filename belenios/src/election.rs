use crate::*;
use serde::de::Error as _;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Election parameters, fixed at setup.
///
/// The fingerprint of the canonical serialization is embedded in every proof produced for
/// the election, so a ballot or decryption can never be replayed into another election.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Election {
    pub version: u32,
    pub description: String,
    pub name: String,
    pub group: String,
    pub public_key: Point,
    pub questions: Vec<Question>,
    pub uuid: String,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub administrator: Option<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_authority: Option<String>,
}

impl Election {
    pub fn new(uuid: &str, name: &str, public_key: Point, questions: Vec<Question>) -> Self {
        Election {
            version: 1,
            description: String::new(),
            name: name.to_owned(),
            group: GROUP_NAME.to_owned(),
            public_key,
            questions,
            uuid: uuid.to_owned(),
            administrator: None,
            credential_authority: None,
        }
    }

    /// Canonical JSON text of the election.
    pub fn to_canonical(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn fingerprint(&self) -> Result<String, Error> {
        Ok(sha256_b64(&self.to_canonical()?))
    }
}

/// A question, decided once at parse time from the JSON shape.
///
/// Homomorphic questions carry no `type` field; the other variants are wrapped as
/// `{"type": ..., "value": {...}}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Question {
    Homomorphic(HomomorphicQuestion),
    List(ListQuestion),
    NonHomomorphic(NonHomomorphicQuestion),
}

/// Bounded multi-select. When `blank` is set the first choice of an answer is the blank flag.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HomomorphicQuestion {
    pub answers: Vec<String>,

    #[serde(default)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub blank: bool,
    pub min: u64,
    pub max: u64,
    pub question: String,
}

/// One list to pick, then candidates inside that list only.
///
/// Each entry of `lists` starts with the list header followed by its candidates.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ListQuestion {
    pub question: String,
    pub lists: Vec<Vec<String>>,
}

/// Free-form answer, decrypted one ballot at a time after a mix-net.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NonHomomorphicQuestion {
    pub question: String,
}

const LIST_TAG: &str = "Lists";
const NON_HOMOMORPHIC_TAG: &str = "NonHomomorphic";

impl Question {
    /// Number of ciphertexts in a homomorphic answer, including the blank flag.
    pub fn choice_count(&self) -> usize {
        match self {
            Question::Homomorphic(q) => q.answers.len() + q.blank as usize,
            Question::List(q) => q.lists.iter().map(Vec::len).sum(),
            Question::NonHomomorphic(_) => 1,
        }
    }

    /// Tally cells of the right shape, all set to `value`.
    pub fn cells<T: Clone>(&self, value: T) -> Cells<T> {
        match self {
            Question::Homomorphic(q) => Cells::Flat(vec![value; q.answers.len() + q.blank as usize]),
            Question::List(q) => Cells::Nested(q.lists.iter().map(|l| vec![value.clone(); l.len()]).collect()),
            Question::NonHomomorphic(_) => Cells::Flat(vec![]),
        }
    }

    pub fn is_homomorphic(&self) -> bool {
        !matches!(self, Question::NonHomomorphic(_))
    }

    /// Selection bounds fit the answers and every list has a header.
    pub fn is_well_formed(&self) -> bool {
        match self {
            Question::Homomorphic(q) => {
                !q.answers.is_empty() && q.min <= q.max && q.max <= q.answers.len() as u64
            }
            Question::List(q) => !q.lists.is_empty() && q.lists.iter().all(|l| !l.is_empty()),
            Question::NonHomomorphic(_) => true,
        }
    }
}

impl Serialize for Question {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Question::Homomorphic(q) => q.serialize(serializer),
            Question::List(q) => {
                let mut s = serializer.serialize_struct("Question", 2)?;
                s.serialize_field("type", LIST_TAG)?;
                s.serialize_field("value", q)?;
                s.end()
            }
            Question::NonHomomorphic(q) => {
                let mut s = serializer.serialize_struct("Question", 2)?;
                s.serialize_field("type", NON_HOMOMORPHIC_TAG)?;
                s.serialize_field("value", q)?;
                s.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Question {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut value = Value::deserialize(deserializer)?;
        let tag = match value.get("type") {
            None => None,
            Some(Value::String(t)) => Some(t.clone()),
            Some(other) => {
                return Err(D::Error::custom(Error::UnknownQuestionType(other.to_string())))
            }
        };
        match tag.as_deref() {
            None => serde_json::from_value(value)
                .map(Question::Homomorphic)
                .map_err(D::Error::custom),
            Some(LIST_TAG) => serde_json::from_value(value["value"].take())
                .map(Question::List)
                .map_err(D::Error::custom),
            Some(NON_HOMOMORPHIC_TAG) => serde_json::from_value(value["value"].take())
                .map(Question::NonHomomorphic)
                .map_err(D::Error::custom),
            Some(other) => Err(D::Error::custom(Error::UnknownQuestionType(other.to_owned()))),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn single_choice_question() -> Question {
        Question::Homomorphic(HomomorphicQuestion {
            answers: vec!["Alice".into(), "Bob".into(), "Carol".into()],
            blank: false,
            min: 1,
            max: 1,
            question: "Who?".into(),
        })
    }

    #[test]
    fn question_variants_follow_json_shape() {
        let h: Question =
            serde_json::from_str(r#"{"answers":["a","b"],"min":0,"max":1,"question":"q"}"#)
                .unwrap();
        assert!(matches!(h, Question::Homomorphic(ref q) if !q.blank && q.answers.len() == 2));

        let l: Question = serde_json::from_str(
            r#"{"type":"Lists","value":{"question":"q","lists":[["L1","a","b"],["L2","c"]]}}"#,
        )
        .unwrap();
        assert_eq!(l.choice_count(), 5);
        assert_eq!(l.cells(0u64), Cells::Nested(vec![vec![0, 0, 0], vec![0, 0]]));

        let nh: Question =
            serde_json::from_str(r#"{"type":"NonHomomorphic","value":{"question":"q"}}"#)
                .unwrap();
        assert!(!nh.is_homomorphic());

        let err = serde_json::from_str::<Question>(r#"{"type":"Borda","value":{}}"#)
            .unwrap_err()
            .to_string();
        assert!(err.contains("unknown question type"));
    }

    #[test]
    fn question_bounds() {
        assert!(single_choice_question().is_well_formed());
        let bounded = |min, max| {
            Question::Homomorphic(HomomorphicQuestion {
                answers: vec!["a".into(), "b".into()],
                blank: false,
                min,
                max,
                question: "q".into(),
            })
        };
        assert!(bounded(0, 2).is_well_formed());
        assert!(!bounded(2, 1).is_well_formed());
        assert!(!bounded(0, u64::MAX).is_well_formed());

        let lists = |lists: Vec<Vec<String>>| Question::List(ListQuestion { question: "q".into(), lists });
        assert!(lists(vec![vec!["L".into()]]).is_well_formed());
        assert!(!lists(vec![]).is_well_formed());
        assert!(!lists(vec![vec!["L".into()], vec![]]).is_well_formed());
    }

    #[test]
    fn serialization_round_trips_and_fingerprint_is_stable() {
        let questions = vec![
            single_choice_question(),
            Question::NonHomomorphic(NonHomomorphicQuestion { question: "Why?".into() }),
        ];
        let election = Election::new("uuid", "Test", Point::generator(), questions);
        let json = election.to_canonical().unwrap();
        assert!(json.contains(r#""type":"NonHomomorphic""#));
        assert!(!json.contains("blank"));

        let back: Election = serde_json::from_str(&json).unwrap();
        assert_eq!(back.questions, election.questions);
        assert_eq!(back.fingerprint().unwrap(), election.fingerprint().unwrap());
    }
}
