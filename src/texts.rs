//! User-facing reply strings (pt-BR), shared by the dialogue engine and the
//! HTTP handlers so both surfaces answer with the same wording.

use crate::nutrition::{ActivityLevel, ImcReading};
use crate::records::repo_types::{MealType, Nutrient, ReminderKind};

pub const WELCOME_MENU: &str = "🌟 *Bem-vindo ao NutriBot!* 🌟\nEscolha uma opção abaixo:";
pub const WELCOME_AUTHENTICATED: &str = "Bem-vindo ao NutriBot! 😊\n\
    Use os comandos no menu para rastrear refeições, água, metas e mais.\n\
    Ex.: /meals, /goals, /water, /summary, /calculations, /reminders, /tips";
pub const WELCOME_ANONYMOUS: &str = "Bem-vindo ao NutriBot! 😊\n\
    Faça login ou cadastre-se para acessar todas as funcionalidades.\n\
    Você também pode usar sem login para ver dicas ou buscar alimentos.";

pub const SELECT_MEAL: &str = "🍽️ Selecione o tipo de refeição:";
pub const SELECT_FOOD: &str = "🥗 Selecione um alimento:";
pub const ENTER_QUANTITY: &str = "📏 Digite a quantidade (gramas):";
pub const MEAL_REGISTERED: &str = "🎉 Refeição registrada com sucesso!";
pub const MEAL_CANCELLED: &str = "❌ Registro de refeição cancelado.";
pub const NO_MEALS: &str = "😕 Nenhuma refeição registrada hoje.";

pub const SELECT_NUTRIENT: &str = "🎯 Selecione o nutriente para definir a meta:";
pub const ENTER_WATER: &str = "💧 Digite a quantidade de água (ml):";

pub const INVALID_NUMBER: &str = "⚠️ Por favor, digite um número válido.";
pub const POSITIVE_NUMBER: &str = "⚠️ Por favor, digite um número positivo.";
pub const NO_FOODS_FOUND: &str = "🔍 Nenhum alimento encontrado. Tente outro termo.";
pub const ACTION_CANCELLED: &str = "❌ Ação cancelada.";
pub const SEARCH_PROMPT: &str = "🔍 Digite o nome do alimento para buscar:";

pub const SELECT_CALCULATOR: &str = "🧮 Selecione uma calculadora:";
pub const ENTER_WEIGHT: &str = "⚖️ Digite seu peso (kg):";
pub const ENTER_HEIGHT: &str = "📏 Digite sua altura (cm):";
pub const ENTER_AGE: &str = "🎂 Digite sua idade (anos):";
pub const SELECT_GENDER: &str = "🚻 Selecione seu sexo:";
pub const SELECT_ACTIVITY_LEVEL: &str = "🏃 Selecione seu nível de atividade:";

pub const SELECT_REMINDER_TYPE: &str = "⏰ Selecione o tipo de lembrete:";
pub const ENTER_REMINDER_TIME: &str =
    "🕒 Digite o horário do lembrete (formato HH:MM, ex.: 08:00):";
pub const INVALID_TIME: &str = "⚠️ Formato de horário inválido. Use HH:MM (ex.: 08:00).";
pub const REMINDER_MEAL: &str = "🍽️ Hora de registrar sua refeição! Use /start para começar.";
pub const REMINDER_WATER: &str = "💧 Hora de se hidratar! Registre sua água com /start.";

pub const ENTER_USERNAME: &str = "Por favor, envie seu nome de usuário.";
pub const INVALID_USERNAME: &str =
    "⚠️ Nome de usuário inválido. Use 3-32 letras, números, '.', '-' ou '_'.";
pub const ENTER_PASSWORD: &str = "Agora, envie sua senha.";
pub const SIGNUP_OK: &str = "Cadastro realizado com sucesso! Use /start para continuar.";
pub const SIGNUP_TAKEN: &str = "Erro ao cadastrar. Tente outro nome de usuário.";
pub const LOGIN_OK: &str = "Login realizado com sucesso! Use /start para continuar.";
pub const LOGIN_BAD_CREDENTIALS: &str = "Usuário ou senha incorretos. Tente novamente.";
pub const LOGIN_REQUIRED: &str =
    "Você precisa estar logado para usar este comando. Use /login ou /signup.";
pub const BACKEND_UNREACHABLE: &str = "Erro ao conectar com o servidor. Tente novamente mais tarde.";
pub const UNKNOWN_INPUT: &str = "Não entendi. Use /start para ver as opções.";

pub fn confirm_meal(quantity_g: f64, food: &str, meal_type: MealType) -> String {
    format!(
        "✅ Confirmar: {quantity_g}g de *{food}* para *{}*?\nResponda \"sim\" ou \"não\".",
        meal_type.label_pt()
    )
}

pub fn enter_goal(nutrient: Nutrient) -> String {
    format!("📈 Digite a meta para *{}*:", nutrient.label_pt())
}

pub fn goal_set(nutrient: Nutrient, value: f64) -> String {
    format!("✅ Meta para *{}* definida como {value}.", nutrient.label_pt())
}

pub fn water_added(amount_ml: f64, total_ml: f64) -> String {
    format!("💦 Adicionado {amount_ml}ml de água. Total hoje: *{total_ml:.0}ml*")
}

pub fn imc_result(reading: &ImcReading) -> String {
    format!(
        "✅ Seu IMC é *{:.1}* ({}).\nInterpretação: {}",
        reading.value,
        reading.category.name_pt(),
        reading.category.interpretation_pt()
    )
}

pub fn tmb_result(tmb: f64) -> String {
    format!(
        "🔥 Sua TMB é *{tmb:.0} kcal/dia*.\nIsso representa as calorias que seu corpo queima em repouso."
    )
}

pub fn tdee_result(tdee: f64, level: ActivityLevel) -> String {
    format!(
        "⚡ Seu TDEE é *{tdee:.0} kcal/dia*.\nIsso estima as calorias que você queima com base no seu nível de atividade ({}).",
        level.label_pt()
    )
}

pub fn fat_percentage_result(fat: f64) -> String {
    format!(
        "📊 Seu percentual de gordura corporal estimado é *{fat:.1}%*.\nNota: Esta é uma estimativa baseada na fórmula de Deurenberg."
    )
}

pub fn reminder_set(kind: ReminderKind, time: &str) -> String {
    format!("✅ Lembrete de *{}* configurado para *{time}*!", kind.label_pt())
}

pub fn daily_summary_header(date: &str) -> String {
    format!("📊 *Resumo Diário ({date})*\n\n")
}

pub const MEALS_SUMMARY: &str = "🍽️ *Refeições do Dia*\n";
pub const DAY_TOTALS: &str = "\n*Totais do Dia*\n";
pub const GOALS_PROGRESS: &str = "\n🎯 *Progresso das Metas*\n";
pub const WATER_SUMMARY: &str = "\n💧 *Consumo de Água*\n";
pub const CALCULATIONS_SUMMARY: &str = "\n🧮 *Últimos Cálculos*\n";

pub const TIPS: [&str; 4] = [
    "🌾 Inclua grãos integrais como aveia para mais fibras!",
    "🥜 Nozes como amêndoas são ótimas para gorduras saudáveis.",
    "💧 Mantenha-se hidratado: busque 2L de água por dia.",
    "🌱 Experimente adicionar soja para proteína vegetal.",
];
