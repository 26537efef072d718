//! Extraction instruction and response schema sent to the model.

use serde_json::{Value, json};

/// MIME type of the documents handed to the model.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Instruction sent alongside every lease document.
pub const EXTRACTION_INSTRUCTION: &str = "\
You are reading a residential lease agreement. Extract the following fields and answer with a \
single JSON object that follows the response schema exactly:
- city, street, province, postalcode: the address of the rented property, not of the landlord.
- lease_start_date, lease_end_date: the tenancy dates in YYYY-MM-DD format.
- rent: the monthly rent as a whole number without currency symbols.
- document_language: the language the agreement is written in, e.g. English or French.
Use \"Not Available\" for any text field that does not appear in the document and -1 for a \
missing rent. Do not guess values.";

const FIELDS: [(&str, &str); 8] = [
    ("city", "The city where the property is located."),
    ("street", "The street address of the property."),
    ("province", "The province or state of the property."),
    ("postalcode", "The postal code or ZIP code of the property."),
    (
        "lease_start_date",
        "The start date of the lease agreement in YYYY-MM-DD format.",
    ),
    (
        "lease_end_date",
        "The end date of the lease agreement in YYYY-MM-DD format.",
    ),
    ("rent", "The monthly rent amount."),
    ("document_language", "The language of the lease document."),
];

/// Vertex AI response schema constraining answers to the lease metadata fields.
pub fn lease_response_schema() -> Value {
    let properties: serde_json::Map<String, Value> = FIELDS
        .iter()
        .map(|(name, description)| {
            let kind = if *name == "rent" { "INTEGER" } else { "STRING" };
            (
                (*name).to_string(),
                json!({ "type": kind, "description": description }),
            )
        })
        .collect();
    let required: Vec<&str> = FIELDS.iter().map(|(name, _)| *name).collect();

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
        "propertyOrdering": required,
    })
}
