//! Minimal HTML form builder for the intake page.

use super::model::{PARAM_EMAIL, PARAM_MESSAGE, PARAM_NAME, PARAM_SUBJECT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    TextArea,
}

#[derive(Debug, Clone)]
pub struct FormField {
    pub id: String,
    pub label: String,
    pub field_type: FieldType,
    pub mandatory: bool,
}

/// A form document: typed input fields plus an optional submit control.
#[derive(Debug, Clone)]
pub struct Form {
    pub title: String,
    pub fields: Vec<FormField>,
    pub submit_label: Option<String>,
}

impl Form {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
            submit_label: None,
        }
    }

    pub fn add_field(
        &mut self,
        id: impl Into<String>,
        field_type: FieldType,
        label: impl Into<String>,
    ) -> &mut FormField {
        self.fields.push(FormField {
            id: id.into(),
            label: label.into(),
            field_type,
            mandatory: false,
        });
        let last = self.fields.len() - 1;
        &mut self.fields[last]
    }

    pub fn add_submit_button(&mut self, label: impl Into<String>) {
        self.submit_label = Some(label.into());
    }

    /// Render as a standalone HTML document posting back to the same URL.
    pub fn render(&self) -> String {
        let title = escape_html(&self.title);
        let mut html = format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
             <body>\n<h1>{title}</h1>\n\
             <form method=\"post\" enctype=\"application/x-www-form-urlencoded\">\n"
        );

        for field in &self.fields {
            let id = escape_html(&field.id);
            let label = escape_html(&field.label);
            let required = if field.mandatory { " required" } else { "" };
            let marker = if field.mandatory { " *" } else { "" };
            html.push_str(&format!("<p><label for=\"{id}\">{label}{marker}</label><br>\n"));
            let input = match field.field_type {
                FieldType::Text => {
                    format!("<input type=\"text\" id=\"{id}\" name=\"{id}\"{required}>")
                }
                FieldType::TextArea => {
                    format!("<textarea id=\"{id}\" name=\"{id}\"{required}></textarea>")
                }
            };
            html.push_str(&input);
            html.push_str("</p>\n");
        }

        if let Some(label) = &self.submit_label {
            html.push_str(&format!(
                "<p><button type=\"submit\">{}</button></p>\n",
                escape_html(label)
            ));
        }
        html.push_str("</form>\n</body>\n</html>\n");
        html
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// The external customer intake form.
pub fn intake_form() -> Form {
    let mut form = Form::new("External customer Form");
    form.add_field(PARAM_NAME, FieldType::Text, "Customer Name")
        .mandatory = true;
    form.add_field(PARAM_EMAIL, FieldType::Text, "Customer Email")
        .mandatory = true;
    form.add_field(PARAM_SUBJECT, FieldType::Text, "Subject");
    form.add_field(PARAM_MESSAGE, FieldType::Text, "Message");
    form.add_submit_button("Submit");
    form
}
