use crate::infra::{parse_date, parse_employment, parse_housing};
use chrono::{Local, NaiveDate};
use clap::Args;
use lendmarket::config::MarketplaceConfig;
use lendmarket::error::AppError;
use lendmarket::marketplace::import::{load_applicants, rank_applicants};
use lendmarket::marketplace::{
    ApplicantAttributes, BankRegistration, ContactDetails, DisbursementRequest, EmploymentStatus,
    HousingType, InMemoryDocumentStore, InMemoryMarketplaceRepository, LeadSubmission,
    MarketplaceError, MarketplaceService, OfferProposal, RequestContext, ScoreOutcome,
    ScoreSource, ScoringEngine,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct ScoreArgs {
    /// Monthly income in local currency
    #[arg(long)]
    pub(crate) income: Option<f64>,
    /// Housing situation (owned, family, rented, mortgaged, other)
    #[arg(long, value_parser = parse_housing)]
    pub(crate) housing: Option<HousingType>,
    /// Employment status (full-time, part-time, self-employed, business-owner, ...)
    #[arg(long, value_parser = parse_employment)]
    pub(crate) employment: Option<EmploymentStatus>,
    #[arg(long)]
    pub(crate) savings: Option<f64>,
    #[arg(long)]
    pub(crate) investments: Option<f64>,
    /// New loans taken during the last three months
    #[arg(long)]
    pub(crate) recent_loans: bool,
    /// Outstanding debt owed elsewhere
    #[arg(long)]
    pub(crate) debt: Option<f64>,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// CSV export with one applicant per row
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Only print the first N ranked applicants
    #[arg(long)]
    pub(crate) limit: Option<usize>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of banks bidding on the demo lead
    #[arg(long, default_value_t = 3)]
    pub(crate) banks: usize,
    /// Disbursement date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) disbursed_on: Option<NaiveDate>,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            banks: 3,
            disbursed_on: None,
        }
    }
}

impl ScoreArgs {
    fn attributes(&self) -> ApplicantAttributes {
        ApplicantAttributes {
            monthly_income: self.income,
            housing: self.housing,
            employment: self.employment,
            savings: self.savings,
            investments: self.investments,
            recent_loans: self.recent_loans,
            has_other_debts: self.debt.is_some_and(|debt| debt > 0.0),
            debt_amount: self.debt,
            ..ApplicantAttributes::default()
        }
    }
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let outcome = ScoringEngine::new().score(&args.attributes());
    render_score(&outcome);
    Ok(())
}

fn render_score(outcome: &ScoreOutcome) {
    println!("Credit score: {}", outcome.score);
    match (&outcome.source, &outcome.breakdown) {
        (ScoreSource::Model, Some(breakdown)) => {
            println!("{:<22} {:>9} {:>7}  notes", "factor", "sub-score", "weight");
            for component in &breakdown.components {
                println!(
                    "{:<22} {:>9.1} {:>7.2}  {}",
                    format!("{:?}", component.factor),
                    component.sub_score,
                    component.weight,
                    component.notes
                );
            }
            println!("Weighted total: {:.2}", breakdown.weighted_total);
        }
        _ => println!("Inputs could not be scored; the neutral fallback was applied."),
    }
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let applicants = load_applicants(&args.csv)?;
    let ranked = rank_applicants(&ScoringEngine::new(), &applicants);
    let shown = args.limit.unwrap_or(ranked.len()).min(ranked.len());

    println!(
        "Ranked {} applicant(s) from {}",
        ranked.len(),
        args.csv.display()
    );
    println!("{:>4}  {:<32} {:>5}  {:>12}", "rank", "applicant", "score", "requested");
    for row in ranked.iter().take(shown) {
        let requested = row
            .requested_amount
            .map(|amount| format!("{amount:.2}"))
            .unwrap_or_else(|| "-".to_string());
        let marker = if row.source == ScoreSource::Fallback {
            " (fallback)"
        } else {
            ""
        };
        println!(
            "{:>4}  {:<32} {:>5}  {:>12}{}",
            row.rank, row.full_name, row.score, requested, marker
        );
    }

    let fallbacks = ranked
        .iter()
        .filter(|row| row.source == ScoreSource::Fallback)
        .count();
    if fallbacks > 0 {
        println!("{fallbacks} applicant(s) scored with the neutral fallback");
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let repository = Arc::new(InMemoryMarketplaceRepository::default());
    let service = MarketplaceService::new(
        repository.clone(),
        Arc::new(InMemoryDocumentStore::default()),
        MarketplaceConfig::default(),
    );
    let applicant = RequestContext::applicant();

    println!("Credit marketplace demo");
    let lead = service.submit_lead(&applicant, demo_submission())?;
    println!(
        "\nLead {} submitted by {} (score {}, status {})",
        lead.id,
        lead.submission.contact.full_name,
        lead.score,
        lead.status.label()
    );

    let mut bids = Vec::new();
    for index in 0..args.banks.max(1) {
        let bank = service.register_bank(
            &RequestContext::system(),
            BankRegistration {
                name: format!("Banco Demo {}", index + 1),
                email: format!("ofertas{}@demo.bancos.gt", index + 1),
            },
        )?;
        let offer = service.create_offer(
            &RequestContext::bank(bank.id),
            &lead.id,
            OfferProposal {
                amount: 30_000.0 - index as f64 * 2_500.0,
                annual_rate: 14.0 + index as f64 * 1.5,
                term_months: 36,
                monthly_installment: None,
                validity_days: None,
            },
        )?;
        println!(
            "  {} offers {:.2} at {:.1}% over {} months ({:.2}/month)",
            bank.name,
            offer.terms.amount,
            offer.terms.annual_rate,
            offer.terms.term_months,
            offer.terms.monthly_installment
        );
        bids.push((bank, offer));
    }

    let Some((winner, chosen)) = bids
        .iter()
        .min_by(|(_, left), (_, right)| {
            left.terms
                .annual_rate
                .total_cmp(&right.terms.annual_rate)
        })
        .cloned()
    else {
        return Ok(());
    };

    let acceptance = service.accept_offer(&applicant, &lead.id, &chosen.id)?;
    println!(
        "\nApplicant accepted {}'s offer; {} other offer(s) rejected (lead status {})",
        winner.name,
        acceptance.rejected.len(),
        acceptance.lead.status.label()
    );

    let disbursed_on = args
        .disbursed_on
        .unwrap_or_else(|| Local::now().date_naive());
    let receipt = service.disburse(
        &RequestContext::bank(winner.id),
        DisbursementRequest {
            lead_id: lead.id,
            amount: chosen.terms.amount,
            disbursed_on: Some(disbursed_on),
        },
    )?;
    println!(
        "{} disbursed {:.2} on {}; offer {} and lead {}",
        winner.name,
        receipt.disbursement.amount,
        receipt.disbursement.disbursed_on,
        receipt.offer.status.label(),
        receipt.lead.status.label()
    );
    let recorded = repository
        .disbursement_count()
        .map_err(MarketplaceError::from)?;
    println!("Disbursements recorded: {recorded}");

    Ok(())
}

fn demo_submission() -> LeadSubmission {
    LeadSubmission {
        contact: ContactDetails {
            full_name: "Ana Lucia Lopez".to_string(),
            email: "ana.lopez@correo.gt".to_string(),
            phone: "5555-1234".to_string(),
            national_id: None,
        },
        applicant: ApplicantAttributes {
            monthly_income: Some(12_000.0),
            housing: Some(HousingType::Owned),
            employment: Some(EmploymentStatus::FullTime),
            ..ApplicantAttributes::default()
        },
        requested_amount: Some(30_000.0),
        loan_purpose: Some("vehicle".to_string()),
    }
}
