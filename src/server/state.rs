use std::sync::Arc;

use crate::analyzer::VideoAnalyzer;
use crate::auth::JwtValidator;
use crate::config::Settings;
use crate::gemini::GenerateContent;
use crate::history::HistoryStore;
use crate::ratelimit::AdmissionController;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub jwt_validator: Arc<JwtValidator>,
    pub admission: Arc<AdmissionController>,
    pub analyzer: Arc<VideoAnalyzer>,
    pub history: Arc<dyn HistoryStore>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        generator: Arc<dyn GenerateContent>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        let jwt_validator = Arc::new(JwtValidator::new(&settings.auth));
        let admission = Arc::new(AdmissionController::new(settings.rate_limit.clone()));
        let analyzer = Arc::new(VideoAnalyzer::new(generator));

        Self {
            settings: Arc::new(settings),
            jwt_validator,
            admission,
            analyzer,
            history,
        }
    }
}
