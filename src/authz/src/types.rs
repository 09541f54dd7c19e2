//! Core authorization types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AuthzError;

/// User identifier (primary key of the user row)
pub type UserId = u64;

/// Platform role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Exerciser,
    Coach,
}

impl Role {
    /// All roles, in declaration order
    pub const ALL: [Role; 3] = [Role::Admin, Role::Exerciser, Role::Coach];

    fn bit(self) -> u8 {
        match self {
            Role::Admin => 0b001,
            Role::Exerciser => 0b010,
            Role::Coach => 0b100,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "Admin",
            Role::Exerciser => "Exerciser",
            Role::Coach => "Coach",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Exerciser" => Ok(Role::Exerciser),
            "Coach" => Ok(Role::Coach),
            other => Err(AuthzError::MisconfiguredPolicy(format!("unknown role '{}'", other))),
        }
    }
}

/// Set of roles, stored as a bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const EMPTY: RoleSet = RoleSet(0);
    pub const ADMIN: RoleSet = RoleSet(0b001);
    pub const EXERCISER: RoleSet = RoleSet(0b010);
    pub const COACH: RoleSet = RoleSet(0b100);
    pub const ADMIN_OR_COACH: RoleSet = RoleSet(0b101);

    /// Build a set from a list of roles
    pub fn of(roles: &[Role]) -> Self {
        roles.iter().fold(Self::EMPTY, |set, role| set.with(*role))
    }

    /// Return a copy of this set with `role` added
    pub fn with(self, role: Role) -> Self {
        RoleSet(self.0 | role.bit())
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate the member roles in declaration order
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(move |role| self.contains(*role))
    }
}

/// Caller of a request (authenticated user or anonymous)
///
/// Built once per request by the authentication layer and never mutated
/// while the request is being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// User id (meaningless when not authenticated)
    pub id: UserId,

    /// Role at request time
    pub role: Role,

    /// Whether the credential was valid
    #[serde(default)]
    pub authenticated: bool,
}

impl Principal {
    /// Create an authenticated principal
    pub fn new(id: UserId, role: Role) -> Self {
        Self {
            id,
            role,
            authenticated: true,
        }
    }

    /// Caller without a valid credential
    pub fn anonymous() -> Self {
        Self {
            id: 0,
            role: Role::Exerciser,
            authenticated: false,
        }
    }

    pub fn admin(id: UserId) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn coach(id: UserId) -> Self {
        Self::new(id, Role::Coach)
    }

    pub fn exerciser(id: UserId) -> Self {
        Self::new(id, Role::Exerciser)
    }
}

/// Anything that can report the user it belongs to.
///
/// User rows own themselves; every other row reports its `user` foreign key.
pub trait Owned {
    fn owner_id(&self) -> Option<UserId>;
}

impl Owned for Principal {
    fn owner_id(&self) -> Option<UserId> {
        Some(self.id)
    }
}

impl<T: Owned + ?Sized> Owned for &T {
    fn owner_id(&self) -> Option<UserId> {
        (**self).owner_id()
    }
}

/// Minimal view of a stored row used for object-level checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TargetRef {
    #[serde(default)]
    pub owner_id: Option<UserId>,
}

impl TargetRef {
    pub fn owned_by(owner_id: UserId) -> Self {
        Self {
            owner_id: Some(owner_id),
        }
    }

    /// Row without an owner (e.g. a catalogue entry)
    pub fn unowned() -> Self {
        Self { owner_id: None }
    }
}

impl Owned for TargetRef {
    fn owner_id(&self) -> Option<UserId> {
        self.owner_id
    }
}

/// Resource types exposed by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    User,
    Activity,
    WorkoutPlan,
    MealPlan,
    HealthRecord,
    HealthDiary,
    ChatMessage,
    UserGoal,
    UserConnection,
}

impl ResourceType {
    pub const ALL: [ResourceType; 9] = [
        ResourceType::User,
        ResourceType::Activity,
        ResourceType::WorkoutPlan,
        ResourceType::MealPlan,
        ResourceType::HealthRecord,
        ResourceType::HealthDiary,
        ResourceType::ChatMessage,
        ResourceType::UserGoal,
        ResourceType::UserConnection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::User => "User",
            ResourceType::Activity => "Activity",
            ResourceType::WorkoutPlan => "WorkoutPlan",
            ResourceType::MealPlan => "MealPlan",
            ResourceType::HealthRecord => "HealthRecord",
            ResourceType::HealthDiary => "HealthDiary",
            ResourceType::ChatMessage => "ChatMessage",
            ResourceType::UserGoal => "UserGoal",
            ResourceType::UserConnection => "UserConnection",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .into_iter()
            .find(|resource| resource.as_str() == s)
            .ok_or_else(|| AuthzError::MisconfiguredPolicy(format!("unknown resource type '{}'", s)))
    }
}

/// Well-known action names
pub mod actions {
    pub const LIST: &str = "list";
    pub const RETRIEVE: &str = "retrieve";
    pub const CREATE: &str = "create";
    pub const UPDATE: &str = "update";
    pub const PARTIAL_UPDATE: &str = "partialUpdate";
    pub const DESTROY: &str = "destroy";

    pub const CHANGE_PASSWORD: &str = "changePassword";
    pub const UPDATE_INFO: &str = "updateInfo";
    pub const GET_CURRENT_USER: &str = "getCurrentUser";
    pub const GET_ALL_USERS: &str = "getAllUsers";
    pub const WEEKLY_STATISTICS: &str = "weeklyStatistics";
    pub const CREATE_PLAN: &str = "createPlan";
    pub const MY_PLANS: &str = "myPlans";
    pub const WEEKLY_SUMMARY: &str = "weeklySummary";
    pub const PLANS_BY_USER: &str = "plansByUser";
    pub const CREATE_MEAL_PLAN: &str = "createMealPlan";
    pub const MEALPLANS_BY_GOAL: &str = "mealplansByGoal";
    pub const MY_DIARIES: &str = "myDiaries";
    pub const SEND_MESSAGE: &str = "sendMessage";

    /// Create/update/partial update/destroy
    pub const WRITES: [&str; 4] = [CREATE, UPDATE, PARTIAL_UPDATE, DESTROY];
}

/// Action being performed (derived from HTTP method + path by routing)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action {
    pub name: String,
}

impl Action {
    /// Create a new action
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
