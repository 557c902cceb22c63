//! Fixed layout of the DIAN form 220 certificate for tax year 2022.
//!
//! The page is data: named cell styles, named text props, and concept tables
//! drive the row construction, so visual changes are edits to the tables
//! below rather than to layout code. Shading is recorded per row because the
//! form breaks plain/shaded alternation around its title and total bars.

use time::macros::format_description;
use time::OffsetDateTime;

use crate::grid::{
    Align, BorderKind, Cell, CellStyle, ImageRef, PageSpec, Rgb, Row, SheetConfig, TextProps,
};
use crate::money;

use super::{FormRecord, FormTemplate};

const WHITE: Rgb = Rgb::new(255, 255, 255);
const BLUE: Rgb = Rgb::new(65, 95, 126);
const LIGHT_BLUE: Rgb = Rgb::new(242, 245, 248);

const FULL: CellStyle = CellStyle {
    border: BorderKind::Full,
    border_color: Some(BLUE),
    background: None,
};
const LEFT: CellStyle = CellStyle {
    border: BorderKind::Left,
    border_color: Some(BLUE),
    background: None,
};
const BLUE_BAR: CellStyle = CellStyle {
    border: BorderKind::Left,
    border_color: Some(BLUE),
    background: Some(BLUE),
};
const SHADED_FULL: CellStyle = CellStyle {
    border: BorderKind::Full,
    border_color: Some(BLUE),
    background: Some(LIGHT_BLUE),
};
const SHADED: CellStyle = CellStyle {
    border: BorderKind::Left,
    border_color: Some(BLUE),
    background: Some(LIGHT_BLUE),
};

/// The 2022 template carries its issue date; DIAN fixed it for the whole
/// filing season.
const EXPEDITION_DATE: &str = "2023-03-31";

/// Income concepts, boxes 36–49: (code, label, shaded row).
const INCOME_CONCEPTS: &[(&str, &str, bool)] = &[
    ("36", "Pagos por salarios o emolumentos eclesiásticos", false),
    (
        "37",
        "Pagos realizados con bonos electrónicos o de papel de servicio, cheques, tarjetas, vales, etc.",
        true,
    ),
    ("38", "Pagos por honorarios", false),
    ("39", "Pagos por servicios", true),
    ("40", "Pagos por comisiones", false),
    ("41", "Pagos por prestaciones sociales", true),
    ("42", "Pagos por viáticos", false),
    ("43", "Pagos por gastos de representación", true),
    (
        "44",
        "Pagos por compensaciones por el trabajo asociado cooperativo",
        false,
    ),
    ("45", "Otros pagos", true),
    (
        "46",
        "Cesantías e intereses de cesantías efectivamente pagadas al empleado",
        false,
    ),
    ("47", "Cesantías consignadas al fondo de cesantias", true),
    ("48", "Pensiones de jubilación, vejez o invalidez", false),
    ("49", "Total de ingresos brutos (Sume 36 a 48)", true),
];

/// Contribution concepts, boxes 50–54.
const CONTRIBUTION_CONCEPTS: &[(&str, &str, bool)] = &[
    (
        "50",
        "Aportes obligatorios por salud a cargo del trabajador",
        true,
    ),
    (
        "51",
        "Aportes obligatorios a fondos de pensiones y solidaridad pensional a cargo del trabajador",
        false,
    ),
    (
        "52",
        "Cotizaciones voluntarias al régimen de ahorro individual con solidaridad - RAIS",
        true,
    ),
    ("53", "Aportes voluntarios a fondos de pensiones", false),
    ("54", "Aportes a cuentas AFC o AVC", true),
];

/// Worker-declared income, boxes 56–69: (received code, withheld code, label,
/// shaded). The values are the worker's to fill in by hand, so the cells stay
/// blank.
const OTHER_INCOME_CONCEPTS: &[(&str, &str, &str, bool)] = &[
    ("56", "63", "Arrendamientos", false),
    ("57", "64", "Honorarios, comisiones y servicios", true),
    ("58", "65", "Intereses y rendimientos financieros", false),
    ("59", "66", "Enajenación de activos fijos", true),
    ("60", "67", "Loterías, rifas, apuestas y similares", false),
    ("61", "68", "Otros", true),
    (
        "62",
        "69",
        "Totales: (Valor recibido: Sume 56 a 61), (Valor retenido: Sume 63 a 68)",
        false,
    ),
];

/// Sworn statements under the signature line.
const WORKER_STATEMENTS: &[&str] = &[
    "1. Mi patrimonio bruto no excedió de 4.500 UVT ($171.018.000).",
    "2. Mis ingresos brutos fueron inferiores a 1.400 UVT ($53.206.000).",
    "3. No fui responsable del impuesto sobre las ventas a 31 de diciembre de 2022.",
    "4. Mis consumos mediante tarjeta de crédito no excedieron la suma de 1.400 UVT ($53.206.000).",
    "5. Que el total de mis compras y consumos no superaron la suma de 1.400 UVT ($53.206.000).",
    "6. Que el valor total de mis consignaciones bancarias, depósitos o inversiones financieras no excedieron los 1.400 UVT ($53.206.000).",
    "Por lo tanto, manifiesto que no estoy obligado a presentar declaración de renta y complementario por el año gravable 2022.",
];

// ── Text props, named after their role on the form ────────────────────────

fn title() -> TextProps {
    TextProps::sized(8.0).align(Align::Center).top(2.0)
}

fn subtitle() -> TextProps {
    TextProps::sized(8.0).align(Align::Center).top(7.0).bottom(4.0)
}

fn warning() -> TextProps {
    TextProps::sized(6.0)
        .align(Align::Center)
        .top(3.0)
        .bottom(2.0)
        .left(8.0)
        .right(8.0)
}

fn form_number() -> TextProps {
    TextProps::sized(8.0).align(Align::Center).top(4.0).bottom(1.5)
}

fn label() -> TextProps {
    TextProps::sized(5.0).top(1.0).left(1.0)
}

fn label_center() -> TextProps {
    TextProps::sized(5.0).top(1.0).align(Align::Center)
}

fn label_white() -> TextProps {
    TextProps::sized(5.0)
        .top(1.0)
        .left(1.0)
        .bottom(1.5)
        .color(WHITE)
}

fn field() -> TextProps {
    TextProps::sized(5.0).top(4.0).bottom(1.5).left(1.0)
}

fn field_center() -> TextProps {
    TextProps::sized(5.0).top(4.0).bottom(1.5).align(Align::Center)
}

fn concept() -> TextProps {
    TextProps::sized(5.0).top(0.9).left(1.0).bottom(0.9)
}

fn concept_center() -> TextProps {
    TextProps::sized(5.0).top(0.9).bottom(1.0).align(Align::Center)
}

fn concept_right() -> TextProps {
    TextProps::sized(5.0)
        .top(0.9)
        .right(1.0)
        .bottom(1.0)
        .align(Align::Right)
}

fn section_title() -> TextProps {
    TextProps::sized(5.0)
        .top(1.0)
        .bottom(1.5)
        .align(Align::Center)
        .bold()
}

fn dependent() -> TextProps {
    TextProps::sized(5.0).top(4.0).left(1.0).bottom(0.9)
}

fn big_box() -> TextProps {
    TextProps::sized(5.0).top(1.0).left(1.0).bottom(1.5).line_gap(1.25)
}

fn statement() -> TextProps {
    TextProps::sized(5.0).top(0.6).left(1.0).bottom(0.6)
}

fn date_only(value: &OffsetDateTime) -> String {
    value
        .date()
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

/// One concept line: label, box code, currency amount, trailing border.
fn concept_row(record: &FormRecord, code: &str, text: &str, shaded: bool) -> Row {
    let style = if shaded { SHADED } else { LEFT };
    Row::new(vec![
        Cell::text(20, text, concept()).styled(style),
        Cell::text(1, code, concept_center()).styled(style),
        Cell::text(7, money::format_es(record.amount(code)), concept_right()).styled(style),
        Cell::new(0).styled(LEFT),
    ])
}

/// One worker-declared line: label plus two blank value boxes.
fn other_income_row(received: &str, withheld: &str, text: &str, shaded: bool) -> Row {
    let style = if shaded { SHADED } else { LEFT };
    Row::new(vec![
        Cell::text(14, text, concept()).styled(style),
        Cell::text(1, received, concept_center()).styled(style),
        Cell::text(6, "", concept()).styled(style),
        Cell::text(1, withheld, concept_center()).styled(style),
        Cell::text(6, "", concept()).styled(style),
        Cell::new(0).styled(LEFT),
    ])
}

fn statement_row(text: &str, signature: &str) -> Row {
    Row::new(vec![
        Cell::text(21, text, statement()).styled(LEFT),
        Cell::text(7, signature, statement()).styled(LEFT),
        Cell::new(0).styled(LEFT),
    ])
}

pub struct Year2022;

impl FormTemplate for Year2022 {
    fn sheet(&self) -> SheetConfig {
        let mut sheet = SheetConfig::letter(28);
        sheet.title = "Certificado de Ingresos y Retenciones 2022".to_string();
        sheet.margin_top = 5.0;
        sheet.margin_bottom = 5.0;
        sheet
    }

    fn build_page(&self, record: &FormRecord) -> PageSpec {
        let mut rows = Vec::new();

        // ── Header ────────────────────────────────────────────────────────
        rows.push(Row::new(vec![
            Cell::new(6)
                .with_image(ImageRef {
                    name: "logo_dian.png".to_string(),
                    top: 1.0,
                    left: 1.0,
                    percent: 95.0,
                })
                .styled(FULL),
            Cell::new(16)
                .with_text(
                    "Certificado de Ingresos y Retenciones por Rentas de Trabajo y de Pensiones",
                    title(),
                )
                .with_text("Año gravable 2022", subtitle())
                .styled(FULL),
            Cell::new(6)
                .with_image(ImageRef {
                    name: "form_220.png".to_string(),
                    top: 1.0,
                    left: 1.0,
                    percent: 95.0,
                })
                .styled(FULL),
        ]));
        rows.push(Row::new(vec![
            Cell::text(
                14,
                "Antes de diligenciar este formulario lea cuidadosamente las instrucciones",
                warning(),
            )
            .styled(FULL),
            Cell::new(14)
                .with_text("4. Número de formulario", label())
                .with_text(record.sequence.to_string(), form_number())
                .styled(FULL),
        ]));

        // ── Withholding agent ─────────────────────────────────────────────
        rows.push(Row::new(vec![
            Cell::new(1).styled(LEFT),
            Cell::new(10)
                .with_text("5. Número de identificación tributaria (NIT)", label())
                .with_text(&record.nit, field())
                .styled(FULL),
            Cell::new(1)
                .with_text("6. DV", label())
                .with_text(&record.dv, field())
                .styled(FULL),
            Cell::new(4)
                .with_text("7. Primer apellido", label())
                .with_text("", field())
                .styled(FULL),
            Cell::new(4)
                .with_text("8. Segundo apellido", label())
                .with_text("", field())
                .styled(FULL),
            Cell::new(4)
                .with_text("9. Primer nombre", label())
                .with_text("", field())
                .styled(FULL),
            Cell::new(4)
                .with_text("10. Otros nombres", label())
                .with_text("", field())
                .styled(FULL),
        ]));
        rows.push(Row::new(vec![
            Cell::new(1).styled(LEFT),
            Cell::new(27)
                .with_text("11. Razón social", label())
                .with_text(record.business_name.to_uppercase(), field())
                .styled(FULL),
        ]));

        // ── Employee ──────────────────────────────────────────────────────
        rows.push(Row::new(vec![
            Cell::new(1).styled(FULL),
            Cell::new(3)
                .with_text("24. Tipo documento", label())
                .with_text(record.identification_type_code.to_string(), field())
                .styled(FULL),
            Cell::new(4)
                .with_text("25. Número Identificación", label())
                .with_text(&record.identification_number, field())
                .styled(FULL),
            Cell::new(5)
                .with_text("26. Primer apellido", label())
                .with_text(record.last_name.to_uppercase(), field())
                .styled(FULL),
            Cell::new(5)
                .with_text("27. Segundo apellido", label())
                .with_text(record.surname.to_uppercase(), field())
                .styled(FULL),
            Cell::new(5)
                .with_text("28. Primer nombre", label())
                .with_text(record.first_name.to_uppercase(), field())
                .styled(FULL),
            Cell::new(5)
                .with_text("29. Otros nombres", label())
                .with_text(record.middle_name.to_uppercase(), field())
                .styled(FULL),
        ]));

        // ── Certification period ──────────────────────────────────────────
        rows.push(Row::new(vec![
            Cell::new(8)
                .with_text("Periodo de la certificación", label_center())
                .with_text(
                    format!(
                        "30. DE: {}    31. A: {}",
                        date_only(&record.begins_at),
                        date_only(&record.ends_at)
                    ),
                    field_center(),
                )
                .styled(FULL),
            Cell::new(5)
                .with_text("32. Fecha de expedición", label_center())
                .with_text(EXPEDITION_DATE, field_center())
                .styled(FULL),
            Cell::new(10)
                .with_text("33. Lugar donde se practicó la retención", label())
                .with_text(record.place.to_uppercase(), field())
                .styled(FULL),
            Cell::new(2)
                .with_text("34. Cód. Dpto.", label())
                .with_text(&record.department_code, field())
                .styled(FULL),
            Cell::new(3)
                .with_text("35. Cód. Ciudad/Municipio", label())
                .with_text(&record.municipality_code, field_center())
                .styled(FULL),
        ]));

        // ── Income concepts ───────────────────────────────────────────────
        rows.push(Row::new(vec![
            Cell::text(20, "Concepto de los ingresos", section_title()).styled(SHADED),
            Cell::text(8, "Valor", section_title()).styled(SHADED),
            Cell::new(0).styled(LEFT),
        ]));
        for (code, text, shaded) in INCOME_CONCEPTS {
            rows.push(concept_row(record, code, text, *shaded));
        }

        // ── Contribution concepts ─────────────────────────────────────────
        rows.push(Row::new(vec![
            Cell::text(20, "Concepto de los aportes", section_title()).styled(FULL),
            Cell::text(8, "Valor", section_title()).styled(FULL),
            Cell::new(0).styled(LEFT),
        ]));
        for (code, text, shaded) in CONTRIBUTION_CONCEPTS {
            rows.push(concept_row(record, code, text, *shaded));
        }

        // ── Withholding total, box 55 ─────────────────────────────────────
        rows.push(Row::new(vec![
            Cell::text(
                20,
                "Valor de la retención en la fuente por ingresos laborales y de pensiones",
                label_white(),
            )
            .styled(BLUE_BAR),
            Cell::text(1, "55", concept_center()).styled(LEFT),
            Cell::text(7, money::format_es(record.amount("55")), concept_right()).styled(LEFT),
            Cell::new(0).styled(LEFT),
        ]));

        // ── Payer block ───────────────────────────────────────────────────
        rows.push(Row::new(vec![Cell::new(28)
            .with_text(
                "Nombre del pagador o agente retenedor: Este documento no requiere para su \
                 validez firma autógrafa de acuerdo con el artículo 10 del Decreto 836 de 1991, \
                 recopilado en el artículo 1.6.1.12.12 del DUT 1625 de octubre 11 de 2016, que \
                 regula el contenido del certificado de retenciones a título de renta.",
                big_box(),
            )
            .with_text(
                record.business_name.to_uppercase(),
                TextProps::sized(6.0).top(8.0).align(Align::Center),
            )
            .with_text(
                format!("NIT: {} - {}", record.identification_number, record.dv),
                TextProps::sized(6.0).top(11.0).bottom(1.5).align(Align::Center),
            )
            .styled(SHADED_FULL)]));

        // ── Worker-declared data ──────────────────────────────────────────
        rows.push(Row::new(vec![Cell::text(
            28,
            "Datos a cargo del trabajador o pensionado",
            concept_center(),
        )
        .styled(FULL)]));
        rows.push(Row::new(vec![
            Cell::text(14, "Concepto de otros ingresos", concept_center()).styled(SHADED_FULL),
            Cell::text(7, "Valor recibido", concept_center()).styled(SHADED_FULL),
            Cell::text(7, "Valor Retenido", concept_center()).styled(SHADED_FULL),
        ]));
        for (received, withheld, text, shaded) in OTHER_INCOME_CONCEPTS {
            rows.push(other_income_row(received, withheld, text, *shaded));
        }
        rows.push(Row::new(vec![
            Cell::text(
                21,
                "Total retenciones año gravable 2022 (Sume 55 + 69)",
                concept(),
            )
            .styled(SHADED),
            Cell::text(1, "70", concept_center()).styled(SHADED),
            Cell::text(6, "", concept()).styled(SHADED),
            Cell::new(0).styled(LEFT),
        ]));

        // ── Assets held ───────────────────────────────────────────────────
        rows.push(Row::new(vec![
            Cell::text(1, "Item", concept_center()).styled(SHADED_FULL),
            Cell::text(20, "Identificación de los bienes poseídos", concept_center())
                .styled(SHADED_FULL),
            Cell::text(7, "72. Valor patrimonial", concept_center()).styled(SHADED_FULL),
        ]));
        for item in 1..=6u8 {
            let style = if item % 2 == 0 { SHADED } else { LEFT };
            rows.push(Row::new(vec![
                Cell::text(1, item.to_string(), concept_center()).styled(style),
                Cell::text(20, "", concept()).styled(style),
                Cell::text(7, "", concept_right()).styled(style),
                Cell::new(0).styled(LEFT),
            ]));
        }
        rows.push(Row::new(vec![
            Cell::text(
                21,
                "Deudas vigentes a 31 de diciembre de 2022",
                label_white(),
            )
            .styled(BLUE_BAR),
            Cell::text(1, "73", concept_center()).styled(FULL),
            Cell::text(6, "", concept_right()).styled(FULL),
        ]));

        // ── Economic dependent ────────────────────────────────────────────
        rows.push(Row::new(vec![Cell::text(
            28,
            "Identificación del dependiente económico de acuerdo al parágrafo 2 del artículo \
             387 del Estatuto Tributario",
            concept_center(),
        )
        .styled(SHADED_FULL)]));
        rows.push(Row::new(vec![
            Cell::new(4)
                .with_text("74. Tipo documento", concept_center())
                .with_text("", dependent())
                .styled(FULL),
            Cell::new(4)
                .with_text("75. No. Documento", concept_center())
                .with_text("", dependent())
                .styled(FULL),
            Cell::new(16)
                .with_text("76. Apellidos y Nombres", concept_center())
                .with_text("", dependent())
                .styled(FULL),
            Cell::new(4)
                .with_text("77. Parentesco", concept_center())
                .with_text("", dependent())
                .styled(FULL),
        ]));

        // ── Sworn statements ──────────────────────────────────────────────
        rows.push(statement_row(
            "Certifico que durante el año gravable 2022:",
            "Firma del Trabajador o Pensionado",
        ));
        for text in WORKER_STATEMENTS {
            rows.push(statement_row(text, ""));
        }

        // ── Closing notes ─────────────────────────────────────────────────
        rows.push(Row::new(vec![Cell::new(28)
            .with_text(
                "Nota: este certificado sustituye para todos los efectos legales la \
                 declaración de Renta y Complementario para el trabajador o pensionado que lo \
                 firme.",
                statement(),
            )
            .with_text(
                "Para aquellos trabajadores independientes contribuyentes del impuesto \
                 unificado deberán presentar la declaración anual consolidada del Régimen \
                 Simple de Tributación (SIMPLE).",
                TextProps::sized(5.0).top(3.5).left(1.0).bottom(1.0),
            )
            .styled(FULL)]));

        PageSpec::new(rows)
    }
}
