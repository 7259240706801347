// libs/assistant-cell/src/services/assistant.rs
use serde_json::{json, Value};
use tracing::info;

use shared_config::AppConfig;

use crate::models::{AssistantError, AssistantRequest, AssistantTask, ChatRequest};
use crate::services::gateway::AiGatewayService;

/// System prompt of the public site chatbot. The welcome message is already
/// rendered by the widget, so the model is told never to greet.
const CHATBOT_SYSTEM_PROMPT: &str = "\
Tu es l'assistant virtuel de Nexus Développement, une agence digitale française \
spécialisée dans la création de solutions numériques sur mesure : sites web, \
applications web et mobiles, automatisation de processus, logos et branding, \
développement personnalisé.

Règles :
- Réponds TOUJOURS en français, de façon professionnelle mais chaleureuse.
- Ne commence JAMAIS par une salutation ni une présentation : le message de \
bienvenue est déjà affiché par l'interface. Réponds directement à la question.
- Les visiteurs peuvent réserver un appel téléphonique sur le site (du lundi \
au vendredi, 9h-18h, créneaux de 15, 30 ou 60 minutes) ou remplir le \
formulaire de devis gratuit. Propose l'un ou l'autre dès qu'un projet concret \
ou une envie d'échanger se manifeste.
- Pour les services sur devis, ne donne jamais de prix ferme ; invite à \
demander un devis.
- Nous n'avons pas de locaux ouverts au public : ne donne jamais d'adresse \
physique. Les rendez-vous se font en visioconférence, par téléphone ou chez \
le client.
- Garde tes réponses concises (2-3 paragraphes maximum).";

const INSIGHTS_PROMPT: &str = "\
Tu es l'analyste commercial de l'agence. À partir du jeu de données fourni \
(devis, appels réservés, pipeline clients), dégage en français les points \
saillants : devis en attente depuis trop longtemps, appels du jour, services \
les plus demandés, tendances. Formate en Markdown avec des sections courtes \
et des recommandations actionnables.";

const ANALYST_PROMPT: &str = "\
Tu es l'analyste commercial de l'agence. Réponds en français à la question \
posée en t'appuyant uniquement sur le jeu de données fourni. Si la donnée ne \
permet pas de répondre, dis-le. Formate en Markdown.";

const ENHANCE_PROMPT: &str = "\
Tu améliores des notes internes rédigées à la va-vite par l'équipe. Reformule \
le texte fourni en français professionnel, clair et concis, sans inventer \
d'information ni changer le sens. Réponds uniquement avec le texte amélioré, \
sans commentaire.";

const SUMMARY_PROMPT: &str = "\
Tu prépares un brief client pour l'équipe commerciale. À partir de \
l'historique fourni (devis, appels, notes), rédige en français un résumé \
d'un paragraphe : qui est le client, ce qu'il veut, où en est la relation et \
la prochaine action recommandée.";

const ESTIMATE_PROMPT: &str = "\
Tu aides à chiffrer des demandes de devis pour une agence digitale française. \
À partir de la demande fournie (services, détails du projet, budget évoqué), \
propose une fourchette de prix réaliste en euros et les hypothèses qui la \
justifient. Réponds en français, en Markdown court.";

pub struct AssistantService {
    gateway: AiGatewayService,
}

impl AssistantService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            gateway: AiGatewayService::new(config),
        }
    }

    /// Start the streaming completion for an admin task.
    pub async fn run(
        &self,
        request: &AssistantRequest,
    ) -> Result<reqwest::Response, AssistantError> {
        let messages = build_task_messages(request)?;
        info!("Running assistant task {:?}", request.task);
        self.gateway.chat_stream(messages).await
    }

    /// Run an admin task to completion and return the aggregated text.
    pub async fn run_collected(
        &self,
        request: &AssistantRequest,
    ) -> Result<String, AssistantError> {
        let response = self.run(request).await?;
        self.gateway.collect(response).await
    }

    /// Start a streaming chatbot turn for a site visitor.
    pub async fn chat(&self, request: &ChatRequest) -> Result<reqwest::Response, AssistantError> {
        if request.messages.is_empty() {
            return Err(AssistantError::InvalidRequest(
                "The conversation is empty".to_string(),
            ));
        }

        let mut messages = vec![json!({
            "role": "system",
            "content": CHATBOT_SYSTEM_PROMPT,
        })];
        for message in &request.messages {
            messages.push(json!({
                "role": message.role,
                "content": message.content,
            }));
        }

        self.gateway.chat_stream(messages).await
    }
}

fn build_task_messages(request: &AssistantRequest) -> Result<Vec<Value>, AssistantError> {
    let (system, user) = match request.task {
        AssistantTask::Insights => (
            INSIGHTS_PROMPT,
            format!("Voici les données du tableau de bord :\n{}", request.data),
        ),
        AssistantTask::CustomQuery => {
            let query = request
                .query
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .ok_or_else(|| {
                    AssistantError::InvalidRequest("A custom query needs a question".to_string())
                })?;
            (
                ANALYST_PROMPT,
                format!(
                    "Question : {}\n\nDonnées du tableau de bord :\n{}",
                    query, request.data
                ),
            )
        }
        AssistantTask::EnhanceText => {
            let original = request
                .data
                .get("originalText")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    AssistantError::InvalidRequest(
                        "Text enhancement needs an originalText field".to_string(),
                    )
                })?;
            let context = request
                .data
                .get("fieldContext")
                .and_then(Value::as_str)
                .unwrap_or("notes");
            (
                ENHANCE_PROMPT,
                format!("Champ : {}\n\nTexte à améliorer :\n{}", context, original),
            )
        }
        AssistantTask::GenerateClientSummary => (
            SUMMARY_PROMPT,
            format!("Historique du client :\n{}", request.data),
        ),
        AssistantTask::EstimatePrice => (
            ESTIMATE_PROMPT,
            format!("Demande de devis :\n{}", request.data),
        ),
    };

    Ok(vec![
        json!({ "role": "system", "content": system }),
        json!({ "role": "user", "content": user }),
    ])
}
