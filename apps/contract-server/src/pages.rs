//! HTML pages of the web form

use std::fmt::Write;

use contract_core::{DonorField, DonorRecord};
use tracing::warn;

use crate::contracts::GeneratedContract;
use crate::session::Flash;

/// Columns listed in the donor picker
const DISPLAY_COLUMNS: [DonorField; 2] = [DonorField::Name, DonorField::Cpf];

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub struct IndexView<'a> {
    pub sheet_url: &'a str,
    pub doc_url: &'a str,
    pub flashes: &'a [Flash],
    pub donors: &'a [DonorRecord],
    /// File name of the downloaded template, when one is available
    pub template_name: Option<String>,
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; max-width: 60rem; margin: 2rem auto; }}
.flash {{ padding: .6rem 1rem; margin: .4rem 0; border-radius: 4px; }}
.flash-success {{ background: #d4edda; }}
.flash-warning {{ background: #fff3cd; }}
.flash-danger {{ background: #f8d7da; }}
table {{ border-collapse: collapse; width: 100%; }}
td, th {{ border: 1px solid #ccc; padding: .3rem .6rem; text-align: left; }}
label {{ display: block; margin-top: .6rem; }}
</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
        body = body
    )
}

fn render_flashes(out: &mut String, flashes: &[Flash]) {
    for flash in flashes {
        let _ = writeln!(
            out,
            r#"<div class="flash flash-{}">{}</div>"#,
            flash.level.as_str(),
            escape_html(&flash.message)
        );
    }
}

/// Columns of the picker that the sheet actually has
fn visible_columns(donors: &[DonorRecord]) -> Vec<DonorField> {
    DISPLAY_COLUMNS
        .into_iter()
        .filter(|field| {
            let present = donors.iter().any(|d| d.contains_column(field.column()));
            if !present {
                warn!(column = field.column(), "Column missing from the spreadsheet");
            }
            present
        })
        .collect()
}

pub fn render_index(view: &IndexView<'_>) -> String {
    let mut body = String::from("<h1>Gerador de Contratos de Doação</h1>\n");
    render_flashes(&mut body, view.flashes);

    let _ = write!(
        body,
        r#"<form method="post" action="/">
<label>URL ou ID da Planilha Google
<input type="text" name="sheet_url" size="80" value="{}"></label>
<label>URL ou ID do Documento Google (modelo)
<input type="text" name="doc_url" size="80" value="{}"></label>
<p><button type="submit">Carregar</button></p>
</form>
"#,
        escape_html(view.sheet_url),
        escape_html(view.doc_url)
    );

    if let Some(name) = &view.template_name {
        let _ = writeln!(body, "<p>Modelo carregado: <code>{}</code></p>", escape_html(name));
    }

    if view.donors.is_empty() {
        return layout("Gerador de Contratos", &body);
    }

    let columns = visible_columns(view.donors);
    body.push_str("<h2>Donatários</h2>\n");
    if columns.is_empty() {
        body.push_str("<p>A planilha não tem as colunas NOME nem CPF.</p>\n");
    }

    let can_generate = view.template_name.is_some();
    if can_generate {
        body.push_str(r#"<form method="post" action="/contracts">"#);
        body.push('\n');
    }

    body.push_str("<table>\n<tr><th></th>");
    for field in &columns {
        let _ = write!(body, "<th>{}</th>", field.column());
    }
    body.push_str("</tr>\n");
    for (index, donor) in view.donors.iter().enumerate() {
        let checked = if index == 0 { " checked" } else { "" };
        let _ = write!(
            body,
            r#"<tr><td><input type="radio" name="donor_index" value="{}"{}></td>"#,
            index, checked
        );
        for field in &columns {
            let value = donor.text(field.column()).unwrap_or_default();
            let _ = write!(body, "<td>{}</td>", escape_html(value.trim()));
        }
        body.push_str("</tr>\n");
    }
    body.push_str("</table>\n");

    if can_generate {
        body.push_str(
            r#"<label>Valor da doação (R$)
<input type="text" name="amount" placeholder="1.000,00" required></label>
<label>Alíquota do ITCMD (%)
<input type="text" name="tax_rate" placeholder="4" required></label>
<label>Formato
<select name="format">
<option value="pdf" selected>PDF</option>
<option value="docx">DOCX</option>
</select></label>
<p><button type="submit">Gerar contrato</button></p>
</form>
"#,
        );
    }

    layout("Gerador de Contratos", &body)
}

pub fn render_success(contract: &GeneratedContract) -> String {
    let mut body = String::from("<h1>Contrato gerado</h1>\n");
    let _ = writeln!(
        body,
        r#"<div class="flash flash-success">Contrato {} para {} gerado com sucesso!</div>"#,
        contract.format.label(),
        escape_html(&contract.donor_name)
    );
    let _ = writeln!(
        body,
        r#"<p><a href="/contracts/{}">Baixar {}</a></p>"#,
        escape_html(&contract.file_name),
        escape_html(&contract.file_name)
    );
    if contract.replaced_runs == 0 {
        body.push_str(
            "<p>Atenção: nenhum marcador foi encontrado no modelo; \
             o arquivo é uma cópia do documento original.</p>\n",
        );
    }
    body.push_str(r#"<p><a href="/">Gerar outro contrato</a></p>"#);
    layout("Contrato gerado", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::OutputFormat;
    use crate::session::FlashLevel;
    use std::path::PathBuf;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_index_without_donors_has_only_source_form() {
        let flashes = vec![Flash {
            level: FlashLevel::Danger,
            message: "<erro>".into(),
        }];
        let html = render_index(&IndexView {
            sheet_url: "https://docs.google.com/spreadsheets/d/abc",
            doc_url: "",
            flashes: &flashes,
            donors: &[],
            template_name: None,
        });
        assert!(html.contains(r#"<div class="flash flash-danger">&lt;erro&gt;</div>"#));
        assert!(html.contains(r#"value="https://docs.google.com/spreadsheets/d/abc""#));
        assert!(!html.contains(r#"action="/contracts""#));
    }

    #[test]
    fn test_index_lists_donors_and_generation_form() {
        let donors = vec![
            DonorRecord::new().with("NOME", "Ana").with("CPF", "111"),
            DonorRecord::new().with("NOME", "Bruno <b>").with("CPF", "222"),
        ];
        let html = render_index(&IndexView {
            sheet_url: "",
            doc_url: "",
            flashes: &[],
            donors: &donors,
            template_name: Some("Modelo.docx".into()),
        });
        assert!(html.contains("<th>NOME</th><th>CPF</th>"));
        assert!(html.contains(r#"name="donor_index" value="1""#));
        assert!(html.contains("<td>Bruno &lt;b&gt;</td>"));
        assert!(html.contains(r#"action="/contracts""#));
        assert!(html.contains(r#"name="tax_rate""#));
    }

    #[test]
    fn test_index_hides_missing_columns() {
        let donors = vec![DonorRecord::new().with("NOME", "Ana")];
        let html = render_index(&IndexView {
            sheet_url: "",
            doc_url: "",
            flashes: &[],
            donors: &donors,
            template_name: None,
        });
        assert!(html.contains("<th>NOME</th></tr>"));
        assert!(!html.contains("<th>CPF</th>"));
        // No template yet, so no generation form
        assert!(!html.contains(r#"action="/contracts""#));
    }

    #[test]
    fn test_success_page_links_file() {
        let html = render_success(&GeneratedContract {
            file_name: "CONTRATO_ANA_20250512.pdf".into(),
            path: PathBuf::from("uploads/contratos_gerados/CONTRATO_ANA_20250512.pdf"),
            donor_name: "ANA".into(),
            format: OutputFormat::Pdf,
            replaced_runs: 3,
        });
        assert!(html.contains(r#"href="/contracts/CONTRATO_ANA_20250512.pdf""#));
        assert!(html.contains("Contrato PDF para ANA gerado com sucesso!"));
        assert!(!html.contains("nenhum marcador"));
    }
}
