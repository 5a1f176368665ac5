//! Fictional orders, people and devices for the reference runtime.
//!
//! The national ids below all pass the check-digit algorithm.

use chrono::{Duration, NaiveDate, Utc};

use osign_contracts::{
    order::NewOrder,
    signer::{DeviceContext, IdentityClaim, NewSigner},
};

/// Creator of every sample order.
pub const OWNER_ID: &str = "user-ana-lima";
pub const OWNER_NAME: &str = "Ana Lima";

/// IP the default lookup answers with.
pub const SESSION_IP: &str = "203.0.113.10";

/// (name, email, role, national id)
pub const PEOPLE: &[(&str, &str, &str, &str)] = &[
    ("Bruno Costa", "bruno.costa@example.com", "Colaborador", "52998224725"),
    ("Carla Dias", "carla.dias@example.com", "Gestor", "11144477735"),
    ("Diego Ramos", "diego.ramos@example.com", "Testemunha", "93541134780"),
    ("Elisa Prado", "elisa.prado@example.com", "Colaborador", "12345678909"),
];

/// A small PDF-like document.
pub fn sample_document() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj << /Type /Catalog >> endobj\n% Ordem de servico: troca de equipamento\n%%EOF\n"
        .to_vec()
}

/// An order for the first `signers` people, due in a week.
pub fn sample_order(os_number: &str, signers: usize) -> NewOrder {
    NewOrder {
        os_number: os_number.to_string(),
        title: "Termo de entrega de equipamento".to_string(),
        description: Some("Notebook patrimônio 0042 entregue ao colaborador".to_string()),
        file_name: "termo-entrega.pdf".to_string(),
        file_bytes: sample_document(),
        expires_at: Utc::now() + Duration::days(7),
        created_by: OWNER_ID.to_string(),
        created_by_name: OWNER_NAME.to_string(),
        signers: PEOPLE
            .iter()
            .take(signers)
            .map(|(name, email, role, _)| NewSigner {
                name: name.to_string(),
                email: email.to_string(),
                role: role.to_string(),
            })
            .collect(),
        draft: false,
    }
}

/// The identity claim person `index` presents.
pub fn claim_for(index: usize) -> IdentityClaim {
    let (name, _, _, national_id) = PEOPLE[index % PEOPLE.len()];
    IdentityClaim {
        full_name: name.to_string(),
        national_id: national_id.to_string(),
        birth_date: NaiveDate::from_ymd_opt(1988, 4, 12).unwrap_or_default(),
    }
}

/// A desktop browser session.
pub fn desktop_device() -> DeviceContext {
    DeviceContext {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/128.0".to_string(),
        platform: Some("Linux x86_64".to_string()),
        language: Some("pt-BR".to_string()),
        timezone: "America/Sao_Paulo".to_string(),
        screen_resolution: "1920x1080".to_string(),
    }
}
