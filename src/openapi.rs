use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::catalog::Vocabulary;
use crate::handlers::{ConfirmVerificationRequest, LoginRequest, SessionResponse, SignupRequest};
use crate::identity::Identity;
use crate::models::{
    CapacitySummary, ClassDetails, ClassForm, ClassKind, ClassListing, ClassRecord, ClassTime,
    ClassType, SeatCapacity, SlotCapacity, TimeSlotForm, Weekday,
};
use crate::search::{SearchFilters, VocabularyField};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let Some(components) = openapi.components.as_mut() else {
            return;
        };
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz_live,
        crate::handlers::healthz_ready,
        crate::handlers::search_classes,
        crate::handlers::get_class,
        crate::handlers::create_class,
        crate::handlers::update_class,
        crate::handlers::delete_class,
        crate::handlers::teacher_classes,
        crate::handlers::suggestions,
        crate::handlers::field_suggestions,
        crate::handlers::vocabulary,
        crate::handlers::signup,
        crate::handlers::login,
        crate::handlers::logout,
        crate::handlers::me,
        crate::handlers::resend_verification,
        crate::handlers::confirm_verification
    ),
    components(schemas(
        ClassListing,
        ClassRecord,
        CapacitySummary,
        ClassDetails,
        ClassKind,
        SlotCapacity,
        SeatCapacity,
        ClassTime,
        ClassType,
        Weekday,
        ClassForm,
        TimeSlotForm,
        SearchFilters,
        VocabularyField,
        Vocabulary,
        Identity,
        SignupRequest,
        LoginRequest,
        ConfirmVerificationRequest,
        SessionResponse
    )),
    tags(
        (name = "classes", description = "Class listings"),
        (name = "search", description = "Autocomplete and reference vocabularies"),
        (name = "auth", description = "Teacher accounts and sessions")
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;
