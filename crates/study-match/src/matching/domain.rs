use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stable user identity issued by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(pub String);

impl Uid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Study time slots offered on the profile form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreferredSchedule {
    #[serde(rename = "Weekdays, 6 PM - 9 PM")]
    WeekdayEarlyEvening,
    #[serde(rename = "Weekdays, 7 PM - 10 PM")]
    WeekdayLateEvening,
    #[serde(rename = "Weekends, 9 AM - 12 PM")]
    WeekendMorning,
    #[serde(rename = "Weekends, 1 PM - 4 PM")]
    WeekendAfternoon,
    #[serde(rename = "Anytime (Flexible)")]
    Flexible,
}

impl PreferredSchedule {
    pub const ALL: [PreferredSchedule; 5] = [
        PreferredSchedule::WeekdayEarlyEvening,
        PreferredSchedule::WeekdayLateEvening,
        PreferredSchedule::WeekendMorning,
        PreferredSchedule::WeekendAfternoon,
        PreferredSchedule::Flexible,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            PreferredSchedule::WeekdayEarlyEvening => "Weekdays, 6 PM - 9 PM",
            PreferredSchedule::WeekdayLateEvening => "Weekdays, 7 PM - 10 PM",
            PreferredSchedule::WeekendMorning => "Weekends, 9 AM - 12 PM",
            PreferredSchedule::WeekendAfternoon => "Weekends, 1 PM - 4 PM",
            PreferredSchedule::Flexible => "Anytime (Flexible)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LearningStyle {
    #[serde(rename = "Visual Learner")]
    Visual,
    #[serde(rename = "Auditory Learner")]
    Auditory,
    #[serde(rename = "Kinesthetic Learner")]
    Kinesthetic,
}

impl LearningStyle {
    pub const ALL: [LearningStyle; 3] = [
        LearningStyle::Visual,
        LearningStyle::Auditory,
        LearningStyle::Kinesthetic,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            LearningStyle::Visual => "Visual Learner",
            LearningStyle::Auditory => "Auditory Learner",
            LearningStyle::Kinesthetic => "Kinesthetic Learner",
        }
    }
}

/// A user's study-matching attributes.
///
/// Missing fields default to empty values so partially filled documents still load; the
/// scorer treats empty values as "no signal".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub uid: Uid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub years_of_study: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub current_subjects: Vec<String>,
    #[serde(
        default,
        serialize_with = "serialize_optional_choice",
        deserialize_with = "deserialize_optional_choice"
    )]
    pub preferred_schedule: Option<PreferredSchedule>,
    #[serde(
        default,
        serialize_with = "serialize_optional_choice",
        deserialize_with = "deserialize_optional_choice"
    )]
    pub learning_style: Option<LearningStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_image: Option<String>,
}

impl Profile {
    /// Blank profile created on a user's first session.
    pub fn empty(uid: Uid) -> Self {
        Self {
            uid,
            name: String::new(),
            major: String::new(),
            years_of_study: String::new(),
            description: String::new(),
            current_subjects: Vec::new(),
            preferred_schedule: None,
            learning_style: None,
            avatar_image: None,
        }
    }
}

/// Owner-supplied replacement for the editable profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub years_of_study: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub current_subjects: Vec<String>,
    #[serde(
        default,
        serialize_with = "serialize_optional_choice",
        deserialize_with = "deserialize_optional_choice"
    )]
    pub preferred_schedule: Option<PreferredSchedule>,
    #[serde(
        default,
        serialize_with = "serialize_optional_choice",
        deserialize_with = "deserialize_optional_choice"
    )]
    pub learning_style: Option<LearningStyle>,
    #[serde(default)]
    pub avatar_image: Option<String>,
}

/// Empty strings on the wire mean "not set".
fn deserialize_optional_choice<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(value) if value.is_empty() => Ok(None),
        Some(value) => T::deserialize(serde_json::Value::String(value))
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn serialize_optional_choice<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize,
{
    match value {
        Some(choice) => choice.serialize(serializer),
        None => serializer.serialize_str(""),
    }
}

/// Storage key of a directed like: `liker_liked`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub liker: Uid,
    pub liked: Uid,
}

impl EdgeKey {
    pub fn new(liker: &Uid, liked: &Uid) -> Self {
        Self {
            liker: liker.clone(),
            liked: liked.clone(),
        }
    }

    pub fn reversed(&self) -> Self {
        Self {
            liker: self.liked.clone(),
            liked: self.liker.clone(),
        }
    }

    pub fn touches(&self, uid: &Uid) -> bool {
        &self.liker == uid || &self.liked == uid
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.liker, self.liked)
    }
}

/// One user's recorded interest in another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeEdge {
    pub liker_uid: Uid,
    pub liked_uid: Uid,
    pub liked_at: DateTime<Utc>,
}

impl LikeEdge {
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(&self.liker_uid, &self.liked_uid)
    }
}

/// Deterministic chat thread identity for an unordered pair of users.
///
/// The messaging side recomputes this from two uids without a lookup, so the ordering
/// (plain string comparison) and the `_` separator must never change.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn for_pair(a: &Uid, b: &Uid) -> Self {
        if a.0 < b.0 {
            Self(format!("{}_{}", a.0, b.0))
        } else {
            Self(format!("{}_{}", b.0, a.0))
        }
    }

    /// Accept either the other member's uid or an already computed thread id.
    pub fn resolve(current: &Uid, other_or_thread: &str) -> Self {
        Self::for_pair(current, &Self::partner_for(current, other_or_thread))
    }

    /// The partner named by `other_or_thread`.
    ///
    /// Uids may themselves contain `_`, so the value is only read as a thread id when it is
    /// exactly the id of a pair containing `current`; anything else is the partner's uid.
    pub fn partner_for(current: &Uid, other_or_thread: &str) -> Uid {
        let me = current.as_str();
        let halves = [
            other_or_thread
                .strip_prefix(me)
                .and_then(|rest| rest.strip_prefix('_')),
            other_or_thread
                .strip_suffix(me)
                .and_then(|rest| rest.strip_suffix('_')),
        ];
        for half in halves.into_iter().flatten() {
            let partner = Uid::new(half);
            if Self::for_pair(current, &partner).as_str() == other_or_thread {
                return partner;
            }
        }
        Uid::new(other_or_thread)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Record provisioned when two users like each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchThread {
    pub id: ThreadId,
    pub users: [Uid; 2],
    pub created_at: DateTime<Utc>,
}

impl MatchThread {
    pub fn for_pair(a: &Uid, b: &Uid, created_at: DateTime<Utc>) -> Self {
        let users = if a <= b {
            [a.clone(), b.clone()]
        } else {
            [b.clone(), a.clone()]
        };
        Self {
            id: ThreadId::for_pair(a, b),
            users,
            created_at,
        }
    }

    pub fn includes(&self, uid: &Uid) -> bool {
        self.users.iter().any(|member| member == uid)
    }

    pub fn partner_of(&self, uid: &Uid) -> Option<&Uid> {
        match &self.users {
            [a, b] if a == uid => Some(b),
            [a, b] if b == uid => Some(a),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

/// Descriptor for a file uploaded to binary storage alongside a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub url: String,
    pub name: String,
    pub content_type: String,
    pub size: u64,
    pub path: String,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_uid: Uid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Where an unordered pair sits in the like protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PairState {
    NoInterest,
    OneSided { liker: Uid, liked: Uid },
    Matched,
}

impl PairState {
    pub const fn label(&self) -> &'static str {
        match self {
            PairState::NoInterest => "no_interest",
            PairState::OneSided { .. } => "one_sided",
            PairState::Matched => "matched",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_id_orders_pair_lexicographically() {
        let alice = Uid::new("alice");
        let bob = Uid::new("bob");
        assert_eq!(ThreadId::for_pair(&alice, &bob).as_str(), "alice_bob");
        assert_eq!(ThreadId::for_pair(&bob, &alice).as_str(), "alice_bob");
    }

    #[test]
    fn thread_id_uses_byte_order_not_case_folding() {
        let upper = Uid::new("Zed");
        let lower = Uid::new("amy");
        assert_eq!(ThreadId::for_pair(&lower, &upper).as_str(), "Zed_amy");
    }

    #[test]
    fn resolve_accepts_existing_thread_ids() {
        let me = Uid::new("u2");
        assert_eq!(ThreadId::resolve(&me, "u1_u2").as_str(), "u1_u2");
        assert_eq!(ThreadId::resolve(&me, "u1").as_str(), "u1_u2");
    }

    #[test]
    fn resolve_treats_underscored_uids_as_partners() {
        let me = Uid::new("stu_1");
        assert_eq!(ThreadId::partner_for(&me, "stu_2"), Uid::new("stu_2"));
        assert_eq!(ThreadId::resolve(&me, "stu_2").as_str(), "stu_1_stu_2");
        assert_eq!(ThreadId::partner_for(&me, "stu_1_stu_2"), Uid::new("stu_2"));
        assert_eq!(ThreadId::resolve(&me, "stu_1_stu_2").as_str(), "stu_1_stu_2");

        let later = Uid::new("stu_2");
        assert_eq!(ThreadId::partner_for(&later, "stu_1_stu_2"), Uid::new("stu_1"));
        // Not a thread this user belongs to, so it names a user.
        assert_eq!(ThreadId::partner_for(&later, "a_b"), Uid::new("a_b"));
    }

    #[test]
    fn profile_treats_empty_choices_as_unset() {
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "uid": "u1",
            "name": "Ana",
            "preferredSchedule": "",
            "learningStyle": "Visual Learner",
        }))
        .expect("profile parses");

        assert_eq!(profile.preferred_schedule, None);
        assert_eq!(profile.learning_style, Some(LearningStyle::Visual));
        assert!(profile.current_subjects.is_empty());

        let value = serde_json::to_value(&profile).expect("profile serializes");
        assert_eq!(value["preferredSchedule"], "");
        assert_eq!(value["learningStyle"], "Visual Learner");
    }

    #[test]
    fn profile_rejects_unknown_schedule() {
        let parsed = serde_json::from_value::<Profile>(serde_json::json!({
            "uid": "u1",
            "preferredSchedule": "Midnight",
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn partner_lookup_is_symmetric() {
        let a = Uid::new("a");
        let b = Uid::new("b");
        let thread = MatchThread::for_pair(&b, &a, Utc::now());
        assert_eq!(thread.users, [a.clone(), b.clone()]);
        assert_eq!(thread.partner_of(&a), Some(&b));
        assert_eq!(thread.partner_of(&b), Some(&a));
        assert_eq!(thread.partner_of(&Uid::new("c")), None);
    }

    #[test]
    fn schedule_labels_match_wire_names() {
        for schedule in PreferredSchedule::ALL {
            let value = serde_json::to_value(schedule).expect("serializes");
            assert_eq!(value, schedule.label());
        }
        for style in LearningStyle::ALL {
            let value = serde_json::to_value(style).expect("serializes");
            assert_eq!(value, style.label());
        }
    }
}
