use std::sync::Arc;

use tracing::{error, warn};

use crate::auth::services::is_valid_username;
use crate::dialogue::backend::{Backend, BackendError};
use crate::dialogue::event::{Button, CallbackToken, ChatEvent, Command, Reply};
use crate::dialogue::flows::{
    CalcFlow, CredentialStep, FlowState, GoalFlow, MealFlow, ReminderFlow,
};
use crate::dialogue::session::{Session, SessionStore};
use crate::foods::{FoodRecord, FoodTable};
use crate::notifier::parse_hhmm;
use crate::nutrition::{ActivityLevel, Gender};
use crate::records::dto::CalculationRequest;
use crate::records::repo_types::{CalcKind, MealType, Nutrient, ReminderKind};
use crate::texts;

/// How many foods the pick-a-food keyboard offers before the user searches.
const FOOD_MENU_SIZE: usize = 8;

enum NumberError {
    NotANumber,
    NotPositive,
}

/// Accepts "12", "12.5" and the pt-BR "12,5"; positive values only.
fn parse_positive(text: &str) -> Result<f64, NumberError> {
    let value: f64 = text
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| NumberError::NotANumber)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(NumberError::NotPositive)
    }
}

fn number_error_text(e: NumberError) -> &'static str {
    match e {
        NumberError::NotANumber => texts::INVALID_NUMBER,
        NumberError::NotPositive => texts::POSITIVE_NUMBER,
    }
}

/// "sim"/"não" (and short forms), anything else is neither.
fn parse_yes_no(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "sim" | "s" => Some(true),
        "não" | "nao" | "n" => Some(false),
        _ => None,
    }
}

fn meal_type_keyboard() -> Vec<Vec<Button>> {
    MealType::ALL
        .iter()
        .map(|mt| vec![Button::new(mt.label_pt(), CallbackToken::MealType(*mt))])
        .collect()
}

fn nutrient_keyboard() -> Vec<Vec<Button>> {
    Nutrient::ALL
        .iter()
        .map(|n| vec![Button::new(n.label_pt(), CallbackToken::Nutrient(*n))])
        .collect()
}

fn calculator_keyboard() -> Vec<Vec<Button>> {
    CalcKind::ALL
        .iter()
        .map(|c| vec![Button::new(c.label_pt(), CallbackToken::Calculator(*c))])
        .collect()
}

fn gender_keyboard() -> Vec<Vec<Button>> {
    vec![vec![
        Button::new(Gender::Male.label_pt(), CallbackToken::Gender(Gender::Male)),
        Button::new(
            Gender::Female.label_pt(),
            CallbackToken::Gender(Gender::Female),
        ),
    ]]
}

fn activity_keyboard() -> Vec<Vec<Button>> {
    ActivityLevel::ALL
        .iter()
        .map(|a| vec![Button::new(a.label_pt(), CallbackToken::Activity(*a))])
        .collect()
}

fn reminder_keyboard() -> Vec<Vec<Button>> {
    ReminderKind::ALL
        .iter()
        .map(|r| vec![Button::new(r.label_pt(), CallbackToken::Reminder(*r))])
        .collect()
}

fn food_keyboard(foods: &[&FoodRecord]) -> Vec<Vec<Button>> {
    let mut rows: Vec<Vec<Button>> = foods
        .iter()
        .map(|f| vec![Button::new(f.description.clone(), CallbackToken::Food(f.id))])
        .collect();
    rows.push(vec![Button::new(
        "🔍 Buscar alimento",
        CallbackToken::SearchFood,
    )]);
    rows
}

/// The per-user finite state machine behind every guided flow. Owns the
/// session map; talks to the rest of the system only through [`Backend`],
/// and performs exactly one terminal write per completed flow.
pub struct DialogueEngine {
    backend: Arc<dyn Backend>,
    foods: Arc<FoodTable>,
    sessions: SessionStore,
}

impl DialogueEngine {
    pub fn new(backend: Arc<dyn Backend>, foods: Arc<FoodTable>) -> Self {
        Self {
            backend,
            foods,
            sessions: SessionStore::new(),
        }
    }

    /// Handle one inbound event for one chat and produce the reply.
    pub async fn handle(&self, chat_id: i64, event: ChatEvent) -> Reply {
        match event {
            ChatEvent::Command(cmd) => self.on_command(chat_id, cmd).await,
            ChatEvent::Callback(token) => self.on_callback(chat_id, token).await,
            ChatEvent::Text(text) => self.on_text(chat_id, text).await,
        }
    }

    async fn on_command(&self, chat_id: i64, cmd: Command) -> Reply {
        // Any command supersedes whatever flow the chat had going.
        self.sessions.clear(chat_id);
        match cmd {
            Command::Cancel => Reply::text(texts::ACTION_CANCELLED),
            Command::Start => self.start_menu(chat_id).await,
            Command::Tips => match self.backend.daily_tip().await {
                Ok(tip) => Reply::text(format!("Dica do dia: {tip}")),
                Err(e) => self.failure_reply(chat_id, "tips", e),
            },
            Command::Summary => match self.backend.daily_summary(chat_id).await {
                Ok(text) => Reply::text(text),
                Err(e) => self.failure_reply(chat_id, "summary", e),
            },
            Command::Signup => {
                self.enter_flow(chat_id, FlowState::Signup(CredentialStep::EnterUsername))
            }
            Command::Login => {
                self.enter_flow(chat_id, FlowState::Login(CredentialStep::EnterUsername))
            }
            Command::Meals => {
                self.enter_protected(chat_id, FlowState::Meal(MealFlow::SelectMealType))
                    .await
            }
            Command::Goals => {
                self.enter_protected(chat_id, FlowState::Goal(GoalFlow::SelectNutrient))
                    .await
            }
            Command::Water => self.enter_protected(chat_id, FlowState::Water).await,
            Command::Calculations => {
                self.enter_protected(chat_id, FlowState::Calc(CalcFlow::SelectCalculator))
                    .await
            }
            Command::Reminders => {
                self.enter_protected(chat_id, FlowState::Reminder(ReminderFlow::SelectKind))
                    .await
            }
        }
    }

    async fn on_callback(&self, chat_id: i64, token: CallbackToken) -> Reply {
        let Some(session) = self.sessions.take(chat_id) else {
            return self.menu_callback(chat_id, token);
        };
        match (session.flow, token) {
            (FlowState::Meal(MealFlow::SelectMealType), CallbackToken::MealType(meal_type)) => {
                self.enter_flow(chat_id, FlowState::Meal(MealFlow::SelectFood { meal_type }))
            }
            (FlowState::Meal(MealFlow::SelectFood { meal_type }), CallbackToken::Food(id)) => {
                match self.foods.get(id) {
                    Some(food) => self.enter_flow(
                        chat_id,
                        FlowState::Meal(MealFlow::EnterQuantity {
                            meal_type,
                            food_id: id,
                            food_name: food.description.clone(),
                        }),
                    ),
                    None => {
                        warn!(chat_id, food_id = id, "food pick does not resolve");
                        self.enter_flow(chat_id, FlowState::Meal(MealFlow::SelectFood { meal_type }))
                    }
                }
            }
            (FlowState::Meal(MealFlow::SelectFood { meal_type }), CallbackToken::SearchFood) => {
                self.enter_flow(chat_id, FlowState::Meal(MealFlow::SearchFood { meal_type }))
            }
            (FlowState::Goal(GoalFlow::SelectNutrient), CallbackToken::Nutrient(nutrient)) => {
                self.enter_flow(chat_id, FlowState::Goal(GoalFlow::EnterValue { nutrient }))
            }
            (FlowState::Calc(CalcFlow::SelectCalculator), CallbackToken::Calculator(kind)) => {
                self.enter_flow(chat_id, FlowState::Calc(CalcFlow::EnterWeight { kind }))
            }
            (
                FlowState::Calc(CalcFlow::SelectGender {
                    kind,
                    weight,
                    height,
                    age,
                }),
                CallbackToken::Gender(gender),
            ) => match kind {
                CalcKind::Tdee => self.enter_flow(
                    chat_id,
                    FlowState::Calc(CalcFlow::SelectActivity {
                        weight,
                        height,
                        age,
                        gender,
                    }),
                ),
                _ => {
                    self.finish_calculation(
                        chat_id,
                        CalculationRequest {
                            calc_type: kind,
                            weight,
                            height,
                            age: Some(age),
                            gender: Some(gender),
                            activity_level: None,
                        },
                    )
                    .await
                }
            },
            (
                FlowState::Calc(CalcFlow::SelectActivity {
                    weight,
                    height,
                    age,
                    gender,
                }),
                CallbackToken::Activity(level),
            ) => {
                self.finish_calculation(
                    chat_id,
                    CalculationRequest {
                        calc_type: CalcKind::Tdee,
                        weight,
                        height,
                        age: Some(age),
                        gender: Some(gender),
                        activity_level: Some(level),
                    },
                )
                .await
            }
            (FlowState::Reminder(ReminderFlow::SelectKind), CallbackToken::Reminder(kind)) => {
                self.enter_flow(chat_id, FlowState::Reminder(ReminderFlow::EnterTime { kind }))
            }
            // A token this state does not accept: keep the session, repeat
            // the current prompt.
            (flow, _) => self.enter_flow(chat_id, flow),
        }
    }

    async fn on_text(&self, chat_id: i64, text: String) -> Reply {
        let Some(session) = self.sessions.take(chat_id) else {
            return Reply::text(texts::UNKNOWN_INPUT);
        };
        match session.flow {
            FlowState::Meal(MealFlow::SearchFood { meal_type }) => {
                let hits = self.foods.search(&text);
                if hits.is_empty() {
                    self.stay_with(
                        chat_id,
                        FlowState::Meal(MealFlow::SearchFood { meal_type }),
                        texts::NO_FOODS_FOUND,
                    )
                } else {
                    let keyboard = food_keyboard(&hits);
                    self.sessions.put(Session {
                        chat_id,
                        flow: FlowState::Meal(MealFlow::SelectFood { meal_type }),
                    });
                    Reply::with_keyboard(texts::SELECT_FOOD, keyboard)
                }
            }
            FlowState::Meal(MealFlow::EnterQuantity {
                meal_type,
                food_id,
                food_name,
            }) => match parse_positive(&text) {
                Ok(quantity_g) => self.enter_flow(
                    chat_id,
                    FlowState::Meal(MealFlow::Confirm {
                        meal_type,
                        food_id,
                        food_name,
                        quantity_g,
                    }),
                ),
                Err(e) => self.stay_with(
                    chat_id,
                    FlowState::Meal(MealFlow::EnterQuantity {
                        meal_type,
                        food_id,
                        food_name,
                    }),
                    number_error_text(e),
                ),
            },
            FlowState::Meal(MealFlow::Confirm {
                meal_type,
                food_id,
                food_name,
                quantity_g,
            }) => match parse_yes_no(&text) {
                Some(true) => {
                    match self
                        .backend
                        .insert_meal(chat_id, meal_type, food_id, quantity_g)
                        .await
                    {
                        Ok(msg) => Reply::text(msg),
                        Err(e) => self.failure_reply(chat_id, "insert_meal", e),
                    }
                }
                Some(false) => Reply::text(texts::MEAL_CANCELLED),
                None => self.enter_flow(
                    chat_id,
                    FlowState::Meal(MealFlow::Confirm {
                        meal_type,
                        food_id,
                        food_name,
                        quantity_g,
                    }),
                ),
            },
            FlowState::Goal(GoalFlow::EnterValue { nutrient }) => match parse_positive(&text) {
                Ok(value) => match self.backend.upsert_goal(chat_id, nutrient, value).await {
                    Ok(msg) => Reply::text(msg),
                    Err(e) => self.failure_reply(chat_id, "upsert_goal", e),
                },
                Err(e) => self.stay_with(
                    chat_id,
                    FlowState::Goal(GoalFlow::EnterValue { nutrient }),
                    number_error_text(e),
                ),
            },
            FlowState::Water => match parse_positive(&text) {
                Ok(amount) => match self.backend.insert_water(chat_id, amount).await {
                    Ok(msg) => Reply::text(msg),
                    Err(e) => self.failure_reply(chat_id, "insert_water", e),
                },
                Err(e) => self.stay_with(chat_id, FlowState::Water, number_error_text(e)),
            },
            FlowState::Calc(CalcFlow::EnterWeight { kind }) => match parse_positive(&text) {
                Ok(weight) => {
                    // Fat never asks for height; the formula defaults it.
                    let next = if kind == CalcKind::Fat {
                        CalcFlow::EnterAge {
                            kind,
                            weight,
                            height: None,
                        }
                    } else {
                        CalcFlow::EnterHeight { kind, weight }
                    };
                    self.enter_flow(chat_id, FlowState::Calc(next))
                }
                Err(e) => self.stay_with(
                    chat_id,
                    FlowState::Calc(CalcFlow::EnterWeight { kind }),
                    number_error_text(e),
                ),
            },
            FlowState::Calc(CalcFlow::EnterHeight { kind, weight }) => {
                match parse_positive(&text) {
                    Ok(height) => {
                        if kind == CalcKind::Imc {
                            self.finish_calculation(
                                chat_id,
                                CalculationRequest {
                                    calc_type: CalcKind::Imc,
                                    weight,
                                    height: Some(height),
                                    age: None,
                                    gender: None,
                                    activity_level: None,
                                },
                            )
                            .await
                        } else {
                            self.enter_flow(
                                chat_id,
                                FlowState::Calc(CalcFlow::EnterAge {
                                    kind,
                                    weight,
                                    height: Some(height),
                                }),
                            )
                        }
                    }
                    Err(e) => self.stay_with(
                        chat_id,
                        FlowState::Calc(CalcFlow::EnterHeight { kind, weight }),
                        number_error_text(e),
                    ),
                }
            }
            FlowState::Calc(CalcFlow::EnterAge {
                kind,
                weight,
                height,
            }) => match parse_positive(&text) {
                Ok(age) => self.enter_flow(
                    chat_id,
                    FlowState::Calc(CalcFlow::SelectGender {
                        kind,
                        weight,
                        height,
                        age,
                    }),
                ),
                Err(e) => self.stay_with(
                    chat_id,
                    FlowState::Calc(CalcFlow::EnterAge {
                        kind,
                        weight,
                        height,
                    }),
                    number_error_text(e),
                ),
            },
            FlowState::Reminder(ReminderFlow::EnterTime { kind }) => {
                if parse_hhmm(&text).is_none() {
                    self.stay_with(
                        chat_id,
                        FlowState::Reminder(ReminderFlow::EnterTime { kind }),
                        texts::INVALID_TIME,
                    )
                } else {
                    match self
                        .backend
                        .upsert_reminder(chat_id, kind, text.trim())
                        .await
                    {
                        Ok(msg) => Reply::text(msg),
                        Err(e) => self.failure_reply(chat_id, "upsert_reminder", e),
                    }
                }
            }
            FlowState::Signup(CredentialStep::EnterUsername) => {
                let username = text.trim();
                if is_valid_username(username) {
                    self.enter_flow(
                        chat_id,
                        FlowState::Signup(CredentialStep::EnterPassword {
                            username: username.to_string(),
                        }),
                    )
                } else {
                    self.stay_with(
                        chat_id,
                        FlowState::Signup(CredentialStep::EnterUsername),
                        texts::INVALID_USERNAME,
                    )
                }
            }
            FlowState::Signup(CredentialStep::EnterPassword { username }) => {
                match self.backend.signup(chat_id, &username, &text).await {
                    Ok(()) => Reply::text(texts::SIGNUP_OK),
                    Err(e) => self.failure_reply(chat_id, "signup", e),
                }
            }
            FlowState::Login(CredentialStep::EnterUsername) => self.enter_flow(
                chat_id,
                FlowState::Login(CredentialStep::EnterPassword {
                    username: text.trim().to_string(),
                }),
            ),
            FlowState::Login(CredentialStep::EnterPassword { username }) => {
                match self.backend.login(chat_id, &username, &text).await {
                    Ok(()) => Reply::text(texts::LOGIN_OK),
                    Err(e) => self.failure_reply(chat_id, "login", e),
                }
            }
            // Free text at a button-selection state: repeat the prompt.
            flow => self.enter_flow(chat_id, flow),
        }
    }

    fn menu_callback(&self, chat_id: i64, token: CallbackToken) -> Reply {
        match token {
            CallbackToken::Signup => {
                self.enter_flow(chat_id, FlowState::Signup(CredentialStep::EnterUsername))
            }
            CallbackToken::Login => {
                self.enter_flow(chat_id, FlowState::Login(CredentialStep::EnterUsername))
            }
            CallbackToken::Anonymous => Reply::text(texts::WELCOME_ANONYMOUS),
            _ => Reply::text(texts::UNKNOWN_INPUT),
        }
    }

    async fn start_menu(&self, chat_id: i64) -> Reply {
        let text = if self.backend.is_authenticated(chat_id).await {
            texts::WELCOME_AUTHENTICATED
        } else {
            texts::WELCOME_ANONYMOUS
        };
        Reply::with_keyboard(
            text,
            vec![
                vec![Button::new("Cadastrar", CallbackToken::Signup)],
                vec![Button::new("Login", CallbackToken::Login)],
                vec![Button::new("Usar sem login", CallbackToken::Anonymous)],
            ],
        )
    }

    /// Store the flow as the chat's session and emit its canonical prompt.
    fn enter_flow(&self, chat_id: i64, flow: FlowState) -> Reply {
        let reply = self.prompt_for(&flow);
        self.sessions.put(Session { chat_id, flow });
        reply
    }

    /// Keep the state but answer with a validation notice instead of the
    /// canonical prompt.
    fn stay_with(&self, chat_id: i64, flow: FlowState, text: &str) -> Reply {
        self.sessions.put(Session { chat_id, flow });
        Reply::text(text)
    }

    async fn enter_protected(&self, chat_id: i64, flow: FlowState) -> Reply {
        if !self.backend.is_authenticated(chat_id).await {
            warn!(chat_id, "protected flow without valid credential");
            return Reply::text(texts::LOGIN_REQUIRED);
        }
        self.enter_flow(chat_id, flow)
    }

    async fn finish_calculation(&self, chat_id: i64, input: CalculationRequest) -> Reply {
        match self.backend.run_calculation(chat_id, input).await {
            Ok(msg) => Reply::text(msg),
            Err(e) => self.failure_reply(chat_id, "calculation", e),
        }
    }

    /// Map a failed terminal call to the reply the user sees. The flow has
    /// already ended; nothing is retried.
    fn failure_reply(&self, chat_id: i64, op: &str, e: BackendError) -> Reply {
        match e {
            BackendError::Unauthorized => {
                warn!(chat_id, op, "operation without valid credential");
                Reply::text(texts::LOGIN_REQUIRED)
            }
            BackendError::UsernameTaken => Reply::text(texts::SIGNUP_TAKEN),
            BackendError::BadCredentials => Reply::text(texts::LOGIN_BAD_CREDENTIALS),
            BackendError::Invalid(msg) => Reply::text(msg),
            BackendError::Unavailable(err) => {
                error!(chat_id, op, error = %err, "backend call failed");
                Reply::text(texts::BACKEND_UNREACHABLE)
            }
        }
    }

    fn prompt_for(&self, flow: &FlowState) -> Reply {
        match flow {
            FlowState::Meal(MealFlow::SelectMealType) => {
                Reply::with_keyboard(texts::SELECT_MEAL, meal_type_keyboard())
            }
            FlowState::Meal(MealFlow::SelectFood { .. }) => {
                let menu: Vec<&FoodRecord> = self.foods.iter().take(FOOD_MENU_SIZE).collect();
                Reply::with_keyboard(texts::SELECT_FOOD, food_keyboard(&menu))
            }
            FlowState::Meal(MealFlow::SearchFood { .. }) => Reply::text(texts::SEARCH_PROMPT),
            FlowState::Meal(MealFlow::EnterQuantity { .. }) => Reply::text(texts::ENTER_QUANTITY),
            FlowState::Meal(MealFlow::Confirm {
                meal_type,
                food_name,
                quantity_g,
                ..
            }) => Reply::text(texts::confirm_meal(*quantity_g, food_name, *meal_type)),
            FlowState::Goal(GoalFlow::SelectNutrient) => {
                Reply::with_keyboard(texts::SELECT_NUTRIENT, nutrient_keyboard())
            }
            FlowState::Goal(GoalFlow::EnterValue { nutrient }) => {
                Reply::text(texts::enter_goal(*nutrient))
            }
            FlowState::Water => Reply::text(texts::ENTER_WATER),
            FlowState::Calc(CalcFlow::SelectCalculator) => {
                Reply::with_keyboard(texts::SELECT_CALCULATOR, calculator_keyboard())
            }
            FlowState::Calc(CalcFlow::EnterWeight { .. }) => Reply::text(texts::ENTER_WEIGHT),
            FlowState::Calc(CalcFlow::EnterHeight { .. }) => Reply::text(texts::ENTER_HEIGHT),
            FlowState::Calc(CalcFlow::EnterAge { .. }) => Reply::text(texts::ENTER_AGE),
            FlowState::Calc(CalcFlow::SelectGender { .. }) => {
                Reply::with_keyboard(texts::SELECT_GENDER, gender_keyboard())
            }
            FlowState::Calc(CalcFlow::SelectActivity { .. }) => {
                Reply::with_keyboard(texts::SELECT_ACTIVITY_LEVEL, activity_keyboard())
            }
            FlowState::Reminder(ReminderFlow::SelectKind) => {
                Reply::with_keyboard(texts::SELECT_REMINDER_TYPE, reminder_keyboard())
            }
            FlowState::Reminder(ReminderFlow::EnterTime { .. }) => {
                Reply::text(texts::ENTER_REMINDER_TIME)
            }
            FlowState::Signup(CredentialStep::EnterUsername)
            | FlowState::Login(CredentialStep::EnterUsername) => Reply::text(texts::ENTER_USERNAME),
            FlowState::Signup(CredentialStep::EnterPassword { .. })
            | FlowState::Login(CredentialStep::EnterPassword { .. }) => {
                Reply::text(texts::ENTER_PASSWORD)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use crate::records::services::{compute_calculation, ServiceError};

    const GOOD_PASSWORD: &str = "open-sesame";

    /// In-memory stand-in for [`StoreBackend`]: records every terminal call
    /// so tests can assert exactly-once semantics.
    #[derive(Default)]
    struct FakeBackend {
        authed: Mutex<HashSet<i64>>,
        taken_usernames: Mutex<HashSet<String>>,
        calls: Mutex<Vec<String>>,
        water_total: Mutex<f64>,
        fail_writes: bool,
    }

    impl FakeBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn with_auth(chat_id: i64) -> Arc<Self> {
            let fake = Self::default();
            fake.authed.lock().unwrap().insert(chat_id);
            Arc::new(fake)
        }

        fn failing(chat_id: i64) -> Arc<Self> {
            let fake = Self {
                fail_writes: true,
                ..Self::default()
            };
            fake.authed.lock().unwrap().insert(chat_id);
            Arc::new(fake)
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn check_up(&self) -> Result<(), BackendError> {
            if self.fail_writes {
                Err(BackendError::Unavailable(anyhow::anyhow!("store down")))
            } else {
                Ok(())
            }
        }

        fn check_auth(&self, chat_id: i64) -> Result<(), BackendError> {
            if self.authed.lock().unwrap().contains(&chat_id) {
                Ok(())
            } else {
                Err(BackendError::Unauthorized)
            }
        }
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn signup(
            &self,
            chat_id: i64,
            username: &str,
            _password: &str,
        ) -> Result<(), BackendError> {
            self.check_up()?;
            if !self.taken_usernames.lock().unwrap().insert(username.into()) {
                return Err(BackendError::UsernameTaken);
            }
            self.authed.lock().unwrap().insert(chat_id);
            self.record(format!("signup:{username}"));
            Ok(())
        }

        async fn login(
            &self,
            chat_id: i64,
            username: &str,
            password: &str,
        ) -> Result<(), BackendError> {
            self.check_up()?;
            if password != GOOD_PASSWORD {
                return Err(BackendError::BadCredentials);
            }
            self.authed.lock().unwrap().insert(chat_id);
            self.record(format!("login:{username}"));
            Ok(())
        }

        async fn is_authenticated(&self, chat_id: i64) -> bool {
            self.authed.lock().unwrap().contains(&chat_id)
        }

        async fn insert_meal(
            &self,
            chat_id: i64,
            meal_type: MealType,
            food_id: i64,
            quantity_g: f64,
        ) -> Result<String, BackendError> {
            self.check_up()?;
            self.check_auth(chat_id)?;
            self.record(format!("meal:{}:{food_id}:{quantity_g}", meal_type.as_str()));
            Ok(texts::MEAL_REGISTERED.to_string())
        }

        async fn upsert_goal(
            &self,
            chat_id: i64,
            nutrient: Nutrient,
            value: f64,
        ) -> Result<String, BackendError> {
            self.check_up()?;
            self.check_auth(chat_id)?;
            self.record(format!("goal:{}:{value}", nutrient.as_str()));
            Ok(texts::goal_set(nutrient, value))
        }

        async fn insert_water(
            &self,
            chat_id: i64,
            amount_ml: f64,
        ) -> Result<String, BackendError> {
            self.check_up()?;
            self.check_auth(chat_id)?;
            let mut total = self.water_total.lock().unwrap();
            *total += amount_ml;
            self.record(format!("water:{amount_ml}"));
            Ok(texts::water_added(amount_ml, *total))
        }

        async fn run_calculation(
            &self,
            chat_id: i64,
            input: CalculationRequest,
        ) -> Result<String, BackendError> {
            self.check_up()?;
            self.check_auth(chat_id)?;
            let outcome = compute_calculation(&input).map_err(|e| match e {
                ServiceError::Invalid(m) => BackendError::Invalid(m),
                ServiceError::Internal(e) => BackendError::Unavailable(e),
            })?;
            self.record(format!("calc:{}:{:.2}", outcome.kind.as_str(), outcome.result));
            Ok(outcome.message)
        }

        async fn upsert_reminder(
            &self,
            chat_id: i64,
            kind: ReminderKind,
            time: &str,
        ) -> Result<String, BackendError> {
            self.check_up()?;
            self.check_auth(chat_id)?;
            self.record(format!("reminder:{}:{time}", kind.as_str()));
            Ok(texts::reminder_set(kind, time))
        }

        async fn daily_summary(&self, chat_id: i64) -> Result<String, BackendError> {
            self.check_up()?;
            self.check_auth(chat_id)?;
            Ok("RESUMO".to_string())
        }

        async fn daily_tip(&self) -> Result<String, BackendError> {
            Ok("DICA".to_string())
        }
    }

    fn engine_with(backend: Arc<FakeBackend>) -> DialogueEngine {
        DialogueEngine::new(backend, Arc::new(FoodTable::sample()))
    }

    async fn cmd(engine: &DialogueEngine, chat_id: i64, command: Command) -> Reply {
        engine.handle(chat_id, ChatEvent::Command(command)).await
    }

    async fn tap(engine: &DialogueEngine, chat_id: i64, token: CallbackToken) -> Reply {
        engine.handle(chat_id, ChatEvent::Callback(token)).await
    }

    async fn say(engine: &DialogueEngine, chat_id: i64, text: &str) -> Reply {
        engine
            .handle(chat_id, ChatEvent::Text(text.to_string()))
            .await
    }

    #[tokio::test]
    async fn meal_flow_end_to_end() {
        let backend = FakeBackend::with_auth(10);
        let engine = engine_with(backend.clone());

        let r = cmd(&engine, 10, Command::Meals).await;
        assert_eq!(r.text, texts::SELECT_MEAL);
        assert_eq!(r.keyboard.len(), MealType::ALL.len());

        let r = tap(&engine, 10, CallbackToken::MealType(MealType::Lunch)).await;
        assert_eq!(r.text, texts::SELECT_FOOD);

        let r = tap(&engine, 10, CallbackToken::Food(12)).await;
        assert_eq!(r.text, texts::ENTER_QUANTITY);

        let r = say(&engine, 10, "200").await;
        assert!(r.text.contains("Arroz, branco, cozido"));
        assert!(r.text.contains("Almoço"));

        let r = say(&engine, 10, "sim").await;
        assert_eq!(r.text, texts::MEAL_REGISTERED);
        assert_eq!(backend.calls(), vec!["meal:lunch:12:200".to_string()]);

        // Session is gone: stray text no longer belongs to a flow.
        let r = say(&engine, 10, "sim").await;
        assert_eq!(r.text, texts::UNKNOWN_INPUT);
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn meal_flow_search_substep() {
        let backend = FakeBackend::with_auth(11);
        let engine = engine_with(backend.clone());

        cmd(&engine, 11, Command::Meals).await;
        tap(&engine, 11, CallbackToken::MealType(MealType::Dinner)).await;

        let r = tap(&engine, 11, CallbackToken::SearchFood).await;
        assert_eq!(r.text, texts::SEARCH_PROMPT);

        // No match keeps the search state.
        let r = say(&engine, 11, "picanha").await;
        assert_eq!(r.text, texts::NO_FOODS_FOUND);

        let r = say(&engine, 11, "feijão").await;
        assert_eq!(r.text, texts::SELECT_FOOD);
        // one hit plus the search-again button
        assert_eq!(r.keyboard.len(), 2);
        assert_eq!(r.keyboard[0][0].token, CallbackToken::Food(7));

        tap(&engine, 11, CallbackToken::Food(7)).await;
        say(&engine, 11, "150").await;
        let r = say(&engine, 11, "sim").await;
        assert_eq!(r.text, texts::MEAL_REGISTERED);
        assert_eq!(backend.calls(), vec!["meal:dinner:7:150".to_string()]);
    }

    #[tokio::test]
    async fn quantity_validation_reprompts_in_place() {
        let backend = FakeBackend::with_auth(12);
        let engine = engine_with(backend.clone());

        cmd(&engine, 12, Command::Meals).await;
        tap(&engine, 12, CallbackToken::MealType(MealType::Breakfast)).await;
        tap(&engine, 12, CallbackToken::Food(2)).await;

        let r = say(&engine, 12, "duzentos").await;
        assert_eq!(r.text, texts::INVALID_NUMBER);
        let r = say(&engine, 12, "-5").await;
        assert_eq!(r.text, texts::POSITIVE_NUMBER);
        let r = say(&engine, 12, "0").await;
        assert_eq!(r.text, texts::POSITIVE_NUMBER);
        assert!(backend.calls().is_empty());

        // Decimal comma still parses.
        let r = say(&engine, 12, "80,5").await;
        assert!(r.text.contains("80.5"));
    }

    #[tokio::test]
    async fn confirm_nao_discards_without_write() {
        let backend = FakeBackend::with_auth(13);
        let engine = engine_with(backend.clone());

        cmd(&engine, 13, Command::Meals).await;
        tap(&engine, 13, CallbackToken::MealType(MealType::Supper)).await;
        tap(&engine, 13, CallbackToken::Food(9)).await;
        say(&engine, 13, "100").await;

        // Unrecognized answer repeats the confirmation.
        let r = say(&engine, 13, "talvez").await;
        assert!(r.text.contains("Confirmar"));

        let r = say(&engine, 13, "não").await;
        assert_eq!(r.text, texts::MEAL_CANCELLED);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn cancel_discards_any_state() {
        let backend = FakeBackend::with_auth(14);
        let engine = engine_with(backend.clone());

        cmd(&engine, 14, Command::Meals).await;
        tap(&engine, 14, CallbackToken::MealType(MealType::Lunch)).await;
        let r = cmd(&engine, 14, Command::Cancel).await;
        assert_eq!(r.text, texts::ACTION_CANCELLED);
        assert!(backend.calls().is_empty());
        assert!(engine.sessions.is_empty());
    }

    #[tokio::test]
    async fn goal_flow_upserts_once() {
        let backend = FakeBackend::with_auth(15);
        let engine = engine_with(backend.clone());

        let r = cmd(&engine, 15, Command::Goals).await;
        assert_eq!(r.text, texts::SELECT_NUTRIENT);

        let r = tap(&engine, 15, CallbackToken::Nutrient(Nutrient::EnergyKcal)).await;
        assert!(r.text.contains("Calorias"));

        let r = say(&engine, 15, "abc").await;
        assert_eq!(r.text, texts::INVALID_NUMBER);

        let r = say(&engine, 15, "2000").await;
        assert!(r.text.contains("2000"));
        assert_eq!(backend.calls(), vec!["goal:energy_kcal:2000".to_string()]);
    }

    #[tokio::test]
    async fn water_flow_reports_running_total() {
        let backend = FakeBackend::with_auth(16);
        let engine = engine_with(backend.clone());

        cmd(&engine, 16, Command::Water).await;
        let r = say(&engine, 16, "-10").await;
        assert_eq!(r.text, texts::POSITIVE_NUMBER);

        let r = say(&engine, 16, "500").await;
        assert!(r.text.contains("500"));
        assert!(r.text.contains("500ml"));

        cmd(&engine, 16, Command::Water).await;
        let r = say(&engine, 16, "300").await;
        assert!(r.text.contains("800ml"));
        assert_eq!(
            backend.calls(),
            vec!["water:500".to_string(), "water:300".to_string()]
        );
    }

    #[tokio::test]
    async fn imc_flow_classifies_normal_weight() {
        let backend = FakeBackend::with_auth(17);
        let engine = engine_with(backend.clone());

        let r = cmd(&engine, 17, Command::Calculations).await;
        assert_eq!(r.text, texts::SELECT_CALCULATOR);

        tap(&engine, 17, CallbackToken::Calculator(CalcKind::Imc)).await;
        say(&engine, 17, "70").await;
        let r = say(&engine, 17, "175").await;
        assert!(r.text.contains("22.9"));
        assert!(r.text.contains("Peso normal"));
        assert_eq!(backend.calls(), vec!["calc:imc:22.86".to_string()]);
    }

    #[tokio::test]
    async fn tdee_flow_collects_activity_level() {
        let backend = FakeBackend::with_auth(18);
        let engine = engine_with(backend.clone());

        cmd(&engine, 18, Command::Calculations).await;
        tap(&engine, 18, CallbackToken::Calculator(CalcKind::Tdee)).await;
        say(&engine, 18, "60").await;
        say(&engine, 18, "165").await;
        let r = say(&engine, 18, "30").await;
        assert_eq!(r.text, texts::SELECT_GENDER);

        let r = tap(&engine, 18, CallbackToken::Gender(Gender::Female)).await;
        assert_eq!(r.text, texts::SELECT_ACTIVITY_LEVEL);

        let r = tap(
            &engine,
            18,
            CallbackToken::Activity(ActivityLevel::Moderate),
        )
        .await;
        assert!(r.text.contains("2046"));
        assert_eq!(backend.calls(), vec!["calc:tdee:2046.39".to_string()]);
    }

    #[tokio::test]
    async fn fat_flow_skips_height() {
        let backend = FakeBackend::with_auth(19);
        let engine = engine_with(backend.clone());

        cmd(&engine, 19, Command::Calculations).await;
        tap(&engine, 19, CallbackToken::Calculator(CalcKind::Fat)).await;
        let r = say(&engine, 19, "70").await;
        // weight goes straight to age, no height prompt
        assert_eq!(r.text, texts::ENTER_AGE);
        say(&engine, 19, "30").await;
        let r = tap(&engine, 19, CallbackToken::Gender(Gender::Male)).await;
        assert!(r.text.contains("gordura corporal"));
        assert_eq!(backend.calls().len(), 1);
        assert!(backend.calls()[0].starts_with("calc:fat:"));
    }

    #[tokio::test]
    async fn reminder_flow_rejects_25_00_then_accepts_07_30() {
        let backend = FakeBackend::with_auth(20);
        let engine = engine_with(backend.clone());

        cmd(&engine, 20, Command::Reminders).await;
        let r = tap(&engine, 20, CallbackToken::Reminder(ReminderKind::Water)).await;
        assert_eq!(r.text, texts::ENTER_REMINDER_TIME);

        let r = say(&engine, 20, "25:00").await;
        assert_eq!(r.text, texts::INVALID_TIME);
        assert!(backend.calls().is_empty());

        let r = say(&engine, 20, "07:30").await;
        assert!(r.text.contains("07:30"));
        assert_eq!(backend.calls(), vec!["reminder:water:07:30".to_string()]);
    }

    #[tokio::test]
    async fn signup_duplicate_username_surfaces_and_ends_flow() {
        let backend = FakeBackend::new();
        backend
            .taken_usernames
            .lock()
            .unwrap()
            .insert("maria".into());
        let engine = engine_with(backend.clone());

        let r = cmd(&engine, 21, Command::Signup).await;
        assert_eq!(r.text, texts::ENTER_USERNAME);
        say(&engine, 21, "maria").await;
        let r = say(&engine, 21, "hunter2hunter2").await;
        assert_eq!(r.text, texts::SIGNUP_TAKEN);
        assert!(!backend.is_authenticated(21).await);
        assert!(engine.sessions.is_empty());
    }

    #[tokio::test]
    async fn signup_rejects_bad_username_in_place() {
        let backend = FakeBackend::new();
        let engine = engine_with(backend.clone());

        cmd(&engine, 22, Command::Signup).await;
        let r = say(&engine, 22, "a b").await;
        assert_eq!(r.text, texts::INVALID_USERNAME);

        let r = say(&engine, 22, "joao_22").await;
        assert_eq!(r.text, texts::ENTER_PASSWORD);
        let r = say(&engine, 22, "hunter2hunter2").await;
        assert_eq!(r.text, texts::SIGNUP_OK);
        assert!(backend.is_authenticated(22).await);
    }

    #[tokio::test]
    async fn login_grants_access_to_protected_flows() {
        let backend = FakeBackend::new();
        let engine = engine_with(backend.clone());

        // Protected flow before login is refused outright.
        let r = cmd(&engine, 23, Command::Meals).await;
        assert_eq!(r.text, texts::LOGIN_REQUIRED);
        assert!(engine.sessions.is_empty());

        cmd(&engine, 23, Command::Login).await;
        say(&engine, 23, "maria").await;
        let r = say(&engine, 23, "wrong-password").await;
        assert_eq!(r.text, texts::LOGIN_BAD_CREDENTIALS);

        // Retry is manual: the user re-enters the flow.
        cmd(&engine, 23, Command::Login).await;
        say(&engine, 23, "maria").await;
        let r = say(&engine, 23, GOOD_PASSWORD).await;
        assert_eq!(r.text, texts::LOGIN_OK);

        let r = cmd(&engine, 23, Command::Meals).await;
        assert_eq!(r.text, texts::SELECT_MEAL);
    }

    #[tokio::test]
    async fn new_flow_supersedes_stale_session() {
        let backend = FakeBackend::with_auth(24);
        let engine = engine_with(backend.clone());

        cmd(&engine, 24, Command::Meals).await;
        tap(&engine, 24, CallbackToken::MealType(MealType::Lunch)).await;

        // Abandon the meal flow mid-way; water takes over.
        cmd(&engine, 24, Command::Water).await;
        let r = say(&engine, 24, "250").await;
        assert!(r.text.contains("250"));
        assert_eq!(backend.calls(), vec!["water:250".to_string()]);
    }

    #[tokio::test]
    async fn chats_do_not_share_sessions() {
        let backend = FakeBackend::with_auth(30);
        backend.authed.lock().unwrap().insert(31);
        let engine = engine_with(backend.clone());

        cmd(&engine, 30, Command::Water).await;
        cmd(&engine, 31, Command::Meals).await;

        // Chat 31's meal flow is untouched by chat 30's number.
        let r = say(&engine, 30, "700").await;
        assert!(r.text.contains("700"));
        let r = tap(&engine, 31, CallbackToken::MealType(MealType::Snack)).await;
        assert_eq!(r.text, texts::SELECT_FOOD);
    }

    #[tokio::test]
    async fn backend_failure_ends_flow_with_generic_message() {
        let backend = FakeBackend::failing(25);
        let engine = engine_with(backend.clone());

        cmd(&engine, 25, Command::Water).await;
        let r = say(&engine, 25, "500").await;
        assert_eq!(r.text, texts::BACKEND_UNREACHABLE);

        // Flow ended; no retained state, no retry.
        let r = say(&engine, 25, "500").await;
        assert_eq!(r.text, texts::UNKNOWN_INPUT);
    }

    #[tokio::test]
    async fn start_menu_and_anonymous_tips() {
        let backend = FakeBackend::new();
        let engine = engine_with(backend.clone());

        let r = cmd(&engine, 26, Command::Start).await;
        assert_eq!(r.text, texts::WELCOME_ANONYMOUS);
        assert_eq!(r.keyboard.len(), 3);

        // Tips need no credential.
        let r = cmd(&engine, 26, Command::Tips).await;
        assert_eq!(r.text, "Dica do dia: DICA");

        backend.authed.lock().unwrap().insert(26);
        let r = cmd(&engine, 26, Command::Start).await;
        assert_eq!(r.text, texts::WELCOME_AUTHENTICATED);
    }

    #[tokio::test]
    async fn summary_requires_credential() {
        let backend = FakeBackend::new();
        let engine = engine_with(backend.clone());

        let r = cmd(&engine, 27, Command::Summary).await;
        assert_eq!(r.text, texts::LOGIN_REQUIRED);

        backend.authed.lock().unwrap().insert(27);
        let r = cmd(&engine, 27, Command::Summary).await;
        assert_eq!(r.text, "RESUMO");
    }

    #[tokio::test]
    async fn mismatched_events_reprompt_current_state() {
        let backend = FakeBackend::with_auth(28);
        let engine = engine_with(backend.clone());

        cmd(&engine, 28, Command::Meals).await;
        // Free text while a button is expected.
        let r = say(&engine, 28, "lasanha").await;
        assert_eq!(r.text, texts::SELECT_MEAL);
        // Token from another flow.
        let r = tap(&engine, 28, CallbackToken::Nutrient(Nutrient::FiberG)).await;
        assert_eq!(r.text, texts::SELECT_MEAL);
        // The flow still works afterwards.
        let r = tap(&engine, 28, CallbackToken::MealType(MealType::Lunch)).await;
        assert_eq!(r.text, texts::SELECT_FOOD);
    }

    #[tokio::test]
    async fn tmb_flow_male_formula() {
        let backend = FakeBackend::with_auth(29);
        let engine = engine_with(backend.clone());

        cmd(&engine, 29, Command::Calculations).await;
        tap(&engine, 29, CallbackToken::Calculator(CalcKind::Tmb)).await;
        say(&engine, 29, "80").await;
        say(&engine, 29, "180").await;
        say(&engine, 29, "30").await;
        let r = tap(&engine, 29, CallbackToken::Gender(Gender::Male)).await;
        // 10*80 + 6.25*180 - 5*30 + 5 = 1780
        assert!(r.text.contains("1780"));
        assert_eq!(backend.calls(), vec!["calc:tmb:1780.00".to_string()]);
    }
}
