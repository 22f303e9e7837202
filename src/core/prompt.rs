//! Fixed instruction contract sent with every clinical note.
//!
//! The instruction enumerates the five categories, their closed vocabularies
//! and the response rules; the note text is appended verbatim. Responses that
//! bend the rules anyway are handled by the repair step in `classify`.

pub const SYSTEM_MESSAGE: &str =
    "Você extrai categorias médicas em JSON puro, sem frases completas.";

pub const INSTRUCTIONS: &str = r#"Você é um assistente médico que recebe um texto de evolução clínica.
Sua tarefa é retornar um JSON puro, estruturado e padronizado, sem linguagem natural descritiva.
Use apenas as opções predefinidas abaixo. Se nada se aplica, use "outros".

Retorne um JSON exatamente neste formato:

{
  "comorbidades": ["HAS", "DM", "DRC", "ICC", "coronariopatia", "transplante de rim", "outros"],
  "motivo_internacao": ["IRA", "DRC", "Sepse", "Choque", "Descompensação cardiológica", "Acidose metabólica", "outros"],
  "medicamentos_continuos": ["IECA", "BRA", "Diurético", "Insulina", "Antibiótico", "Corticoide", "outros"],
  "sintomas": ["Dispneia", "Tosse", "Disúria", "Edema", "Oligúria", "Febre", "Dor", "Náusea", "outros"],
  "achados_exame_fisico": ["Hipotenso", "Edemaciado", "Taquipneico", "Anúrico", "outros"]
}

Regras:
- Liste apenas as categorias reconhecíveis (sem frases descritivas).
- Use sempre listas, mesmo que haja um único item.
- Nunca use texto corrido, diagnósticos compostos ou frases.
- Responda com JSON puro e válido (sem ``` ou comentários).

Texto:
"#;

pub fn compose(texto: &str) -> String {
    format!("{INSTRUCTIONS}{texto}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composed_prompt_ends_with_note_text() {
        let prompt = compose("Paciente hipertenso com febre");
        assert!(prompt.starts_with(INSTRUCTIONS));
        assert!(prompt.ends_with("Paciente hipertenso com febre"));
    }

    #[test]
    fn instructions_name_all_five_categories() {
        for key in [
            "comorbidades",
            "motivo_internacao",
            "medicamentos_continuos",
            "sintomas",
            "achados_exame_fisico",
        ] {
            assert!(INSTRUCTIONS.contains(key));
        }
    }
}
