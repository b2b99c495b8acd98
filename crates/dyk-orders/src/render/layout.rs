//! # Invoice Layout
//!
//! Places every piece of an invoice on A4 pages as positioned text runs and
//! rules. Pure: the same invoice, items and company always give the same
//! layout. The PDF engine only draws what is here.
//!
//! ## Page Structure
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Company name                        FAKTURA  │
//! │ address / org.nr / moms.nr     number, dates │
//! │                                              │
//! │ Faktureras till                              │
//! │ buyer name, address, e-mail                  │
//! │                                              │
//! │ Beskrivning        Antal  À-pris  Moms  Belopp│
//! │ ──────────────────────────────────────────── │
//! │ rows ... (continue on next page when full)   │
//! │                                              │
//! │                    Summa exkl. moms          │
//! │                    Moms 6 % / 25 %           │
//! │                    Att betala                │
//! │ Betalningsreferens, bankgiro, IBAN           │
//! │ ──────────────────────────────────────────── │
//! │ footer: org.nr · Godkänd för F-skatt   1 / 2 │
//! └──────────────────────────────────────────────┘
//! ```

use dyk_core::{CompanySettings, Invoice, InvoiceItem, VatRate};

pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;

const MARGIN: f32 = 50.0;
const RIGHT: f32 = PAGE_WIDTH - MARGIN;
const FOOTER_Y: f32 = 40.0;
/// Lowest baseline a table row or summary line may use.
const CONTENT_BOTTOM: f32 = 90.0;

const BODY: f32 = 10.0;
const SMALL: f32 = 8.0;
const ROW_HEIGHT: f32 = 16.0;
const LINE_HEIGHT: f32 = 13.0;

// Right edges of the numeric table columns
const COL_QTY: f32 = 330.0;
const COL_UNIT: f32 = 410.0;
const COL_VAT: f32 = 465.0;
const COL_TOTAL: f32 = RIGHT;
const DESCRIPTION_MAX_CHARS: usize = 48;

pub const F_TAX_NOTICE: &str = "Godkänd för F-skatt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// One run of text. `x` is the left edge, `y` the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub weight: FontWeight,
    pub text: String,
}

/// A horizontal rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub x1: f32,
    pub x2: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub texts: Vec<TextRun>,
    pub rules: Vec<Rule>,
}

impl Page {
    fn text(&mut self, x: f32, y: f32, size: f32, weight: FontWeight, text: impl Into<String>) {
        self.texts.push(TextRun {
            x,
            y,
            size,
            weight,
            text: text.into(),
        });
    }

    fn text_right(&mut self, right: f32, y: f32, size: f32, weight: FontWeight, text: impl Into<String>) {
        let text = text.into();
        let x = right - text_width(&text, size);
        self.text(x, y, size, weight, text);
    }

    fn rule(&mut self, y: f32) {
        self.rules.push(Rule {
            x1: MARGIN,
            x2: RIGHT,
            y,
        });
    }

    /// Every text on the page, top to bottom. Used by tests and previews.
    pub fn plain_text(&self) -> Vec<&str> {
        self.texts.iter().map(|t| t.text.as_str()).collect()
    }
}

/// A laid-out invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceLayout {
    pub title: String,
    pub pages: Vec<Page>,
}

impl InvoiceLayout {
    /// Lays out an invoice.
    pub fn build(invoice: &Invoice, items: &[InvoiceItem], company: &CompanySettings) -> Self {
        let mut builder = LayoutBuilder::new(invoice);
        builder.first_page_header(company);
        builder.buyer_block();
        builder.table_header();

        let mut items: Vec<&InvoiceItem> = items.iter().collect();
        items.sort_by_key(|item| item.line_number);
        for item in items {
            builder.item_row(item);
        }

        builder.totals();
        builder.payment_block(company);

        let mut pages = builder.finish();
        let count = pages.len();
        for (idx, page) in pages.iter_mut().enumerate() {
            footer(page, company, idx + 1, count);
        }

        InvoiceLayout {
            title: format!("Faktura {}", invoice.invoice_number),
            pages,
        }
    }

    /// All text in reading order across pages.
    pub fn all_text(&self) -> Vec<&str> {
        self.pages.iter().flat_map(|p| p.plain_text()).collect()
    }
}

struct LayoutBuilder<'a> {
    invoice: &'a Invoice,
    pages: Vec<Page>,
    current: Page,
    y: f32,
}

impl<'a> LayoutBuilder<'a> {
    fn new(invoice: &'a Invoice) -> Self {
        LayoutBuilder {
            invoice,
            pages: Vec::new(),
            current: Page::default(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn first_page_header(&mut self, company: &CompanySettings) {
        let top = self.y - 10.0;
        let page = &mut self.current;

        let name = if company.name.trim().is_empty() {
            "Dykskolan"
        } else {
            company.name.as_str()
        };
        page.text(MARGIN, top, 18.0, FontWeight::Bold, name);
        page.text_right(RIGHT, top, 18.0, FontWeight::Bold, "FAKTURA");

        let mut left_y = top - 22.0;
        let company_lines = [
            company.address.clone(),
            company.postal_line(),
            company.org_number.as_ref().map(|v| format!("Org.nr: {}", v)),
            company.vat_number.as_ref().map(|v| format!("Momsreg.nr: {}", v)),
            company.email.clone(),
            company.phone.as_ref().map(|v| format!("Tel: {}", v)),
        ];
        for line in company_lines.into_iter().flatten() {
            page.text(MARGIN, left_y, BODY, FontWeight::Regular, line);
            left_y -= LINE_HEIGHT;
        }

        let mut right_y = top - 22.0;
        let meta = [
            ("Fakturanummer", self.invoice.invoice_number.clone()),
            ("Fakturadatum", self.invoice.invoice_date.to_string()),
            ("Förfallodatum", self.invoice.due_date.to_string()),
        ];
        for (label, value) in meta {
            page.text(360.0, right_y, BODY, FontWeight::Bold, label);
            page.text_right(RIGHT, right_y, BODY, FontWeight::Regular, value);
            right_y -= LINE_HEIGHT;
        }

        self.y = left_y.min(right_y) - 20.0;
    }

    fn buyer_block(&mut self) {
        let invoice = self.invoice;
        let page = &mut self.current;
        page.text(MARGIN, self.y, BODY, FontWeight::Bold, "Faktureras till");
        self.y -= LINE_HEIGHT;

        let lines = [
            Some(invoice.buyer_name.clone()),
            invoice.buyer_address.clone(),
            Some(invoice.buyer_email.clone()),
        ];
        for line in lines.into_iter().flatten() {
            page.text(MARGIN, self.y, BODY, FontWeight::Regular, line);
            self.y -= LINE_HEIGHT;
        }
        self.y -= 20.0;
    }

    fn table_header(&mut self) {
        let y = self.y;
        let page = &mut self.current;
        page.text(MARGIN, y, BODY, FontWeight::Bold, "Beskrivning");
        page.text_right(COL_QTY, y, BODY, FontWeight::Bold, "Antal");
        page.text_right(COL_UNIT, y, BODY, FontWeight::Bold, "À-pris");
        page.text_right(COL_VAT, y, BODY, FontWeight::Bold, "Moms");
        page.text_right(COL_TOTAL, y, BODY, FontWeight::Bold, "Belopp");
        page.rule(y - 5.0);
        self.y -= ROW_HEIGHT + 2.0;
    }

    /// Starts a new page when fewer than `needed` points remain.
    fn ensure_room(&mut self, needed: f32, repeat_table_header: bool) {
        if self.y - needed >= CONTENT_BOTTOM {
            return;
        }
        let full = std::mem::take(&mut self.current);
        self.pages.push(full);
        self.y = PAGE_HEIGHT - MARGIN;

        let continued = format!("Faktura {} (forts.)", self.invoice.invoice_number);
        self.current.text(MARGIN, self.y, BODY, FontWeight::Bold, continued);
        self.y -= ROW_HEIGHT * 2.0;

        if repeat_table_header {
            self.table_header();
        }
    }

    fn item_row(&mut self, item: &InvoiceItem) {
        self.ensure_room(ROW_HEIGHT, true);
        let y = self.y;
        let page = &mut self.current;

        page.text(MARGIN, y, BODY, FontWeight::Regular, truncate(&item.description, DESCRIPTION_MAX_CHARS));
        page.text_right(COL_QTY, y, BODY, FontWeight::Regular, item.quantity.to_string());
        page.text_right(COL_UNIT, y, BODY, FontWeight::Regular, item.unit_price().to_decimal_string());
        page.text_right(COL_VAT, y, BODY, FontWeight::Regular, item.vat_rate().percent_label());
        page.text_right(COL_TOTAL, y, BODY, FontWeight::Regular, item.total().to_decimal_string());
        self.y -= ROW_HEIGHT;
    }

    fn totals(&mut self) {
        let rate_lines = self.invoice.vat_summary.len() as f32;
        self.ensure_room(ROW_HEIGHT * (rate_lines + 4.0), false);

        self.current.rule(self.y + ROW_HEIGHT - 5.0);
        self.y -= 6.0;

        let label_x = 300.0;
        let invoice = self.invoice;
        let page = &mut self.current;

        page.text(label_x, self.y, BODY, FontWeight::Regular, "Summa exkl. moms");
        page.text_right(COL_TOTAL, self.y, BODY, FontWeight::Regular, invoice.subtotal().to_string());
        self.y -= ROW_HEIGHT;

        for (key, bucket) in invoice.vat_summary.iter() {
            let rate = VatRate::parse_fraction(key)
                .map(|r| r.percent_label())
                .unwrap_or_else(|_| key.to_string());
            let label = format!(
                "Moms {} på {}",
                rate,
                bucket.net.to_decimal_string()
            );
            page.text(label_x, self.y, BODY, FontWeight::Regular, label);
            page.text_right(COL_TOTAL, self.y, BODY, FontWeight::Regular, bucket.vat.to_string());
            self.y -= ROW_HEIGHT;
        }

        page.text(label_x, self.y, BODY, FontWeight::Regular, "Summa moms");
        page.text_right(COL_TOTAL, self.y, BODY, FontWeight::Regular, invoice.vat_amount().to_string());
        self.y -= ROW_HEIGHT;

        page.text(label_x, self.y, 12.0, FontWeight::Bold, "Att betala");
        page.text_right(COL_TOTAL, self.y, 12.0, FontWeight::Bold, invoice.total_amount().to_string());
        self.y -= ROW_HEIGHT * 2.0;
    }

    fn payment_block(&mut self, company: &CompanySettings) {
        let lines: Vec<String> = [
            Some(format!("Betalningsreferens: {}", self.invoice.payment_reference())),
            company.bankgiro.as_ref().map(|v| format!("Bankgiro: {}", v)),
            company.iban.as_ref().map(|v| format!("IBAN: {}", v)),
            Some(format!("Förfallodatum: {}", self.invoice.due_date)),
        ]
        .into_iter()
        .flatten()
        .collect();

        self.ensure_room(LINE_HEIGHT * (lines.len() as f32 + 1.0), false);
        self.current.text(MARGIN, self.y, BODY, FontWeight::Bold, "Betalning");
        self.y -= LINE_HEIGHT;
        for line in lines {
            self.current.text(MARGIN, self.y, BODY, FontWeight::Regular, line);
            self.y -= LINE_HEIGHT;
        }
    }

    fn finish(mut self) -> Vec<Page> {
        self.pages.push(self.current);
        self.pages
    }
}

fn footer(page: &mut Page, company: &CompanySettings, number: usize, count: usize) {
    page.rule(FOOTER_Y + 12.0);

    let mut parts: Vec<String> = Vec::new();
    if !company.name.trim().is_empty() {
        parts.push(company.name.clone());
    }
    if let Some(org) = &company.org_number {
        parts.push(format!("Org.nr {}", org));
    }
    if company.f_tax {
        parts.push(F_TAX_NOTICE.to_string());
    }
    if !parts.is_empty() {
        page.text(MARGIN, FOOTER_Y, SMALL, FontWeight::Regular, parts.join(" · "));
    }
    page.text_right(RIGHT, FOOTER_Y, SMALL, FontWeight::Regular, format!("{} / {}", number, count));
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

/// Approximate Helvetica advance width in points.
pub fn text_width(text: &str, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| match c {
            ' ' | '.' | ',' | ':' | ';' | '!' | 'i' | 'j' | 'l' | 'I' | '\'' => 278,
            'f' | 't' | 'r' | '-' | '(' | ')' | '/' => 333,
            'm' | 'M' | 'W' | 'w' | '@' => 833,
            'A'..='Z' | 'Å' | 'Ä' | 'Ö' => 667,
            _ => 556,
        })
        .sum();
    units as f32 * size / 1000.0
}
