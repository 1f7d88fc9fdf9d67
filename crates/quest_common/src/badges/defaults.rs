//! Built-in badge catalog.
//!
//! Badge ids are stable identifiers stored by clients; never rename one.
//! Requirements built with `Requirement::placeholder` point at a stand-in
//! event until the real one exists (see `BadgeCatalog::placeholders`).

use super::catalog::{BadgeCategory, BadgeDefinition, Requirement};
use crate::taxonomy::events::*;

fn badge(
    id: &str,
    name: &str,
    description: &str,
    icon: &str,
    category: BadgeCategory,
    requirements: Vec<Requirement>,
) -> BadgeDefinition {
    BadgeDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        category,
        requirements,
    }
}

fn req(event_type: &str, count: u64) -> Requirement {
    Requirement::new(event_type, count)
}

pub fn builtin_badges() -> Vec<BadgeDefinition> {
    use BadgeCategory::*;

    vec![
        // Profile
        badge(
            "perfil_completo",
            "Complete Profile",
            "Fill in every profile field",
            "user-check",
            Profile,
            vec![req(PROFILE_COMPLETED, 1)],
        ),
        badge(
            "foto_perfil",
            "Say Cheese",
            "Upload a profile picture",
            "camera",
            Profile,
            vec![req(PROFILE_AVATAR_UPLOADED, 1)],
        ),
        badge(
            "perfil_al_dia",
            "Always Up to Date",
            "Update your profile 10 times",
            "refresh",
            Profile,
            vec![req(PROFILE_UPDATED, 10)],
        ),

        // CV
        badge(
            "primera_seccion",
            "First Brick",
            "Add your first CV section",
            "file-plus",
            Cv,
            vec![req(CV_SECTION_ADDED, 1)],
        ),
        badge(
            "cv_completo",
            "Complete CV",
            "Add experience, education, certification, language, project and volunteering entries",
            "file-check",
            Cv,
            vec![
                req(CV_EXPERIENCE_ADDED, 1),
                req(CV_EDUCATION_ADDED, 1),
                req(CV_CERTIFICATION_ADDED, 1),
                req(CV_LANGUAGE_ADDED, 1),
                req(CV_PROJECT_ADDED, 1),
                req(CV_VOLUNTEERING_ADDED, 1),
            ],
        ),
        badge(
            "experiencia_solida",
            "Seasoned",
            "Add 5 work experiences",
            "briefcase",
            Cv,
            vec![req(CV_EXPERIENCE_ADDED, 5)],
        ),
        badge(
            "formacion_continua",
            "Lifelong Learner",
            "Add 3 education entries and 3 certifications",
            "graduation-cap",
            Cv,
            vec![req(CV_EDUCATION_ADDED, 3), req(CV_CERTIFICATION_ADDED, 3)],
        ),
        badge(
            "poliglota",
            "Polyglot",
            "Add 3 languages",
            "languages",
            Cv,
            vec![req(CV_LANGUAGE_ADDED, 3)],
        ),
        badge(
            "constructor",
            "Builder",
            "Add 5 projects",
            "hammer",
            Cv,
            vec![req(CV_PROJECT_ADDED, 5)],
        ),
        badge(
            "voluntario",
            "Helping Hand",
            "Add a volunteering entry",
            "heart",
            Cv,
            vec![req(CV_VOLUNTEERING_ADDED, 1)],
        ),

        // Job offers
        badge(
            "primera_oferta",
            "First Offer",
            "Save your first job offer",
            "bookmark",
            JobOffers,
            vec![req(JOB_OFFER_CREATED, 1)],
        ),
        badge(
            "cazador_ofertas",
            "Offer Hunter",
            "Save 10 job offers",
            "target",
            JobOffers,
            vec![req(JOB_OFFER_CREATED, 10)],
        ),
        badge(
            "maestro_busqueda",
            "Search Master",
            "Save 50 job offers",
            "search",
            JobOffers,
            vec![req(JOB_OFFER_CREATED, 50)],
        ),
        badge(
            "centenario",
            "Centurion",
            "Save 100 job offers",
            "trophy",
            JobOffers,
            vec![req(JOB_OFFER_CREATED, 100)],
        ),
        badge(
            "organizado",
            "Organized",
            "Update offer statuses 10 times and add 10 notes",
            "clipboard",
            JobOffers,
            vec![req(JOB_OFFER_STATUS_UPDATED, 10), req(JOB_OFFER_NOTE_ADDED, 10)],
        ),
        badge(
            "cv_a_medida",
            "Tailor Made",
            "Pick CV sections for 5 offers",
            "scissors",
            JobOffers,
            vec![req(JOB_OFFER_CV_SECTIONS_SELECTED, 5)],
        ),
        badge(
            "listo_para_enviar",
            "Ready to Send",
            "Download a tailored CV",
            "download",
            JobOffers,
            vec![req(JOB_OFFER_CV_DOWNLOADED, 1)],
        ),

        // Applications
        badge(
            "primera_entrevista",
            "Foot in the Door",
            "Schedule your first interview",
            "calendar",
            Applications,
            vec![req(APPLICATION_INTERVIEW_SCHEDULED, 1)],
        ),
        badge(
            "entrevistador_experto",
            "Interview Pro",
            "Schedule 10 interviews",
            "mic",
            Applications,
            vec![req(APPLICATION_INTERVIEW_SCHEDULED, 10)],
        ),
        badge(
            "oferta_recibida",
            "They Want You",
            "Receive a job offer",
            "mail",
            Applications,
            vec![req(APPLICATION_OFFER_RECEIVED, 1)],
        ),
        badge(
            "contratado",
            "Hired",
            "Accept a job offer",
            "party",
            Applications,
            vec![req(APPLICATION_OFFER_ACCEPTED, 1)],
        ),

        // AI
        badge(
            "explorador_ia",
            "AI Explorer",
            "Generate AI insights for an offer",
            "sparkles",
            Ai,
            vec![req(AI_INSIGHTS_GENERATED, 1)],
        ),
        badge(
            "analista_ia",
            "AI Analyst",
            "Generate AI insights 10 times",
            "chart",
            Ai,
            vec![req(AI_INSIGHTS_GENERATED, 10)],
        ),
        badge(
            "pulido_ia",
            "Polished",
            "Improve 5 sections with AI",
            "wand",
            Ai,
            vec![req(AI_SECTION_IMPROVED, 5)],
        ),
        badge(
            "asistente_ia",
            "AI Sidekick",
            "Use every AI feature at least once",
            "robot",
            Ai,
            vec![
                req(AI_INSIGHTS_GENERATED, 1),
                req(AI_SECTION_IMPROVED, 1),
                req(AI_CV_SECTIONS_SUGGESTED, 1),
            ],
        ),

        // Streaks
        badge(
            "constancia_semanal",
            "Week Warrior",
            "Log in 7 days in a row",
            "flame",
            Streaks,
            vec![req(STREAK_7_DAYS, 1)],
        ),
        badge(
            "constancia_mensual",
            "Monthly Master",
            "Log in 30 days in a row",
            "fire",
            Streaks,
            vec![req(STREAK_30_DAYS, 1)],
        ),
        badge(
            "habito_diario",
            "Daily Habit",
            "Log in on 14 different days",
            "sun",
            Streaks,
            vec![req(DAILY_LOGIN, 14)],
        ),

        // Community
        badge(
            "votante_innovacion",
            "Innovation Voter",
            "Vote on a community innovation idea",
            "lightbulb",
            Community,
            vec![Requirement::placeholder(
                NETWORK_CONNECTION_MADE,
                1,
                "innovation voting has no event yet; swap for the vote event when it exists",
            )],
        ),
        badge(
            "conector",
            "Connector",
            "Make 10 connections",
            "link",
            Community,
            vec![req(NETWORK_CONNECTION_MADE, 10)],
        ),
    ]
}
