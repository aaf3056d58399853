//! Enquiry and contact forms
//!
//! A valid submission is stored first and only then handed to WhatsApp with a
//! redirect. Invalid input re-renders the form with every field error.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::api::middleware::{AppState, PageError};
use crate::models::{EnquiryType, MachineSnapshot, Purpose};
use crate::services::catalog::BackLink;
use crate::services::enquiry::{EnquiryContext, EnquiryForm, FieldErrors, SubmitError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/enquiry", get(enquiry_page).post(submit_enquiry))
        .route("/contact", get(contact_page).post(submit_contact))
}

/// What the enquiry page was opened for
#[derive(Debug, Default, Deserialize)]
pub struct EnquiryQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub machine: Option<String>,
    pub part: Option<String>,
}

impl EnquiryQuery {
    fn kind(&self) -> EnquiryType {
        self.kind
            .as_deref()
            .and_then(|k| k.parse().ok())
            .unwrap_or(EnquiryType::Contact)
    }

    /// Form action preserving the query
    fn action(&self) -> String {
        let mut action = format!("/enquiry?type={}", self.kind());
        if let Some(machine) = self.machine.as_deref().filter(|m| !m.is_empty()) {
            action.push_str(&format!("&machine={}", urlencoding::encode(machine)));
        }
        if let Some(part) = self.part.as_deref().filter(|p| !p.is_empty()) {
            action.push_str(&format!("&part={}", urlencoding::encode(part)));
        }
        action
    }
}

/// Heading and item summary shown above the form
#[derive(Debug, Serialize)]
struct EnquirySubject {
    kind: String,
    heading: String,
    machine: Option<MachineSnapshot>,
    part: Option<String>,
}

impl EnquirySubject {
    fn of(context: &EnquiryContext) -> Self {
        let heading = match context.kind {
            EnquiryType::Rental => "Rental Enquiry".to_string(),
            EnquiryType::Sales => "Sales Enquiry".to_string(),
            EnquiryType::Part => "Spare Part Enquiry".to_string(),
            EnquiryType::Contact => "Send Us a Message".to_string(),
        };
        Self {
            kind: context.kind.to_string(),
            heading,
            machine: context.machine.clone(),
            part: context.part.clone(),
        }
    }
}

/// Page context for the query; not found for an unknown machine, unavailable
/// when the machine cannot be loaded
async fn resolve(state: &AppState, query: &EnquiryQuery) -> Result<EnquiryContext, PageError> {
    let kind = query.kind();
    match kind {
        EnquiryType::Rental | EnquiryType::Sales => {
            let purpose = if kind == EnquiryType::Sales {
                Purpose::Sales
            } else {
                Purpose::Rental
            };
            let Some(id) = query.machine.as_deref().filter(|m| !m.trim().is_empty()) else {
                return Ok(EnquiryContext {
                    kind,
                    source: Some(state.catalog.absolute_url(purpose.section_path())),
                    ..EnquiryContext::default()
                });
            };
            let machine = match state.catalog.machine(id).await {
                Ok(Some(machine)) => machine,
                Ok(None) => {
                    return Err(state.not_found(
                        "Machine Not Found",
                        "The machine you're looking for doesn't exist.",
                        BackLink::section(purpose),
                        "/enquiry",
                    ))
                }
                Err(e) => return Err(state.unavailable(&e.user_message(), "/enquiry")),
            };
            let path = format!(
                "{}/{}/{}",
                purpose.section_path(),
                machine.category.slug(),
                urlencoding::encode(&machine.id)
            );
            Ok(EnquiryContext {
                kind,
                machine: Some(MachineSnapshot::from(&machine)),
                part: None,
                source: Some(state.catalog.absolute_url(&path)),
            })
        }
        EnquiryType::Part => Ok(EnquiryContext {
            kind,
            machine: None,
            part: query.part.clone().filter(|p| !p.trim().is_empty()),
            source: Some(state.catalog.absolute_url("/spare-parts")),
        }),
        EnquiryType::Contact => Ok(EnquiryContext::contact()),
    }
}

struct FormPage<'a> {
    template: &'a str,
    path: &'a str,
    action: String,
    context: &'a EnquiryContext,
}

fn render_form(
    state: &AppState,
    page: &FormPage<'_>,
    form: &EnquiryForm,
    errors: &FieldErrors,
    notice: Option<&str>,
    status: StatusCode,
) -> Result<Response, PageError> {
    let mut context = TeraContext::new();
    context.insert("subject", &EnquirySubject::of(page.context));
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("notice", &notice);
    context.insert("action", &page.action);
    context.insert("require_message", &state.enquiries.require_message());
    let html = state.render(page.template, &context, page.path)?;
    Ok((status, html).into_response())
}

async fn submit(state: &AppState, page: FormPage<'_>, form: EnquiryForm) -> Result<Response, PageError> {
    match state.enquiries.submit(&form, page.context.clone()).await {
        Ok(submission) => Ok(Redirect::to(&submission.whatsapp_url).into_response()),
        Err(SubmitError::Invalid(errors)) => render_form(
            state,
            &page,
            &form,
            &errors,
            None,
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        Err(SubmitError::Backend(e)) => {
            tracing::error!("Failed to submit enquiry: {}", e);
            render_form(
                state,
                &page,
                &form,
                &FieldErrors::default(),
                Some("We could not send your enquiry. Please try again or call us directly."),
                StatusCode::BAD_GATEWAY,
            )
        }
    }
}

/// GET /enquiry
async fn enquiry_page(
    State(state): State<AppState>,
    Query(query): Query<EnquiryQuery>,
) -> Result<Response, PageError> {
    let context = resolve(&state, &query).await?;
    let page = FormPage {
        template: "enquiry.html",
        path: "/enquiry",
        action: query.action(),
        context: &context,
    };
    render_form(
        &state,
        &page,
        &EnquiryForm::default(),
        &FieldErrors::default(),
        None,
        StatusCode::OK,
    )
}

/// POST /enquiry
async fn submit_enquiry(
    State(state): State<AppState>,
    Query(query): Query<EnquiryQuery>,
    Form(form): Form<EnquiryForm>,
) -> Result<Response, PageError> {
    let context = resolve(&state, &query).await?;
    let page = FormPage {
        template: "enquiry.html",
        path: "/enquiry",
        action: query.action(),
        context: &context,
    };
    submit(&state, page, form).await
}

/// GET /contact
async fn contact_page(State(state): State<AppState>) -> Result<Response, PageError> {
    let context = EnquiryContext::contact();
    let page = FormPage {
        template: "contact.html",
        path: "/contact",
        action: "/contact".to_string(),
        context: &context,
    };
    render_form(
        &state,
        &page,
        &EnquiryForm::default(),
        &FieldErrors::default(),
        None,
        StatusCode::OK,
    )
}

/// POST /contact
async fn submit_contact(
    State(state): State<AppState>,
    Form(form): Form<EnquiryForm>,
) -> Result<Response, PageError> {
    let context = EnquiryContext::contact();
    let page = FormPage {
        template: "contact.html",
        path: "/contact",
        action: "/contact".to_string(),
        context: &context,
    };
    submit(&state, page, form).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_kind_defaults_to_contact() {
        assert_eq!(EnquiryQuery::default().kind(), EnquiryType::Contact);
        let query = EnquiryQuery {
            kind: Some("sales".to_string()),
            ..EnquiryQuery::default()
        };
        assert_eq!(query.kind(), EnquiryType::Sales);
    }

    #[test]
    fn test_action_keeps_item() {
        let query = EnquiryQuery {
            kind: Some("Part".to_string()),
            machine: None,
            part: Some("Bucket Teeth Set".to_string()),
        };
        assert_eq!(query.action(), "/enquiry?type=Part&part=Bucket%20Teeth%20Set");
    }
}
