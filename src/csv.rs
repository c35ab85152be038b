use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use crate::credential::CredentialError;
use crate::engine::Member;
use crate::model::{
    Channel, MemberRef, ParseError, PaymentMethod, PurchaseRequest, Tender, Tier,
};
use crate::{Amount, Transaction};

/// Errors that can occur when reading or writing csv files
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: {source}")]
    Decode { line: usize, source: ParseError },

    #[error("line {line}: {field} must not be negative")]
    NegativeBalance { line: usize, field: &'static str },

    #[error("line {line}: {source}")]
    Credential {
        line: usize,
        source: CredentialError,
    },

    #[error("line {line}: {method} purchase missing amount")]
    MissingAmount { line: usize, method: PaymentMethod },

    #[error("line {line}: POINTS purchase missing required_points")]
    MissingRequiredPoints { line: usize },

    #[error("failed to write row: {0}")]
    Write(csv::Error),

    #[error("failed to flush output: {0}")]
    Flush(#[from] io::Error),
}

#[derive(Debug, Deserialize)]
struct MemberRow {
    membership_no: String,
    phone: String,
    pin: String,
    tier: String,
    points: u64,
    wallet: f64,
    spend: f64,
    vip_booking: Option<bool>,
    club_home: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PurchaseRow {
    member: String,
    pin: String,
    method: String,
    amount: Option<f64>,
    required_points: Option<u64>,
    points_override: Option<u64>,
    channel: Option<String>,
    key: Option<String>,
    #[serde(default)]
    product: Option<String>,
}

#[derive(Debug, Serialize)]
struct MemberOutputRow<'a> {
    membership_no: &'a str,
    tier: String,
    points: u64,
    wallet: String,
    spend: String,
}

#[derive(Debug, Serialize)]
struct JournalRow<'a> {
    id: Uuid,
    member: &'a str,
    club: Option<&'a str>,
    method: String,
    channel: String,
    gross: String,
    net: String,
    fee: String,
    points_earned: u64,
    points_spent: u64,
    brand_applied: Option<&'a str>,
    reward_eligible: bool,
    timestamp: DateTime<Utc>,
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>, CsvError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.display().to_string(),
            source,
        })
}

/// Values starting with a digit or `+` are phone numbers, anything else is a
/// membership number.
fn member_ref(value: String) -> MemberRef {
    match value.chars().next() {
        Some(c) if c.is_ascii_digit() || c == '+' => MemberRef::Phone(value),
        _ => MemberRef::MembershipNo(value),
    }
}

/// Read members from a csv file
pub fn read_members(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<Member, CsvError>>, CsvError> {
    let reader = open(path.as_ref())?;

    Ok(reader
        .into_deserialize::<MemberRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            let tier: Tier = row
                .tier
                .parse()
                .map_err(|source| CsvError::Decode { line, source })?;

            let wallet = Amount::from_float(row.wallet);
            let spend = Amount::from_float(row.spend);
            for (field, value) in [("wallet", wallet), ("spend", spend)] {
                if value.is_negative() {
                    return Err(CsvError::NegativeBalance { line, field });
                }
            }

            let mut member = Member::new(row.membership_no, row.phone, &row.pin)
                .map_err(|source| CsvError::Credential { line, source })?
                .with_tier(tier)
                .with_points(row.points)
                .with_wallet(wallet)
                .with_rolling_spend(spend)
                .with_vip_booking(row.vip_booking.unwrap_or(false));
            if let Some(club) = row.club_home.filter(|club| !club.is_empty()) {
                member = member.with_club_home(club);
            }
            Ok(member)
        }))
}

/// Read purchase requests from a csv file
pub fn read_purchases(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<PurchaseRequest, CsvError>>, CsvError> {
    let reader = open(path.as_ref())?;

    Ok(reader
        .into_deserialize::<PurchaseRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2;
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            let decode = |source| CsvError::Decode { line, source };

            let method: PaymentMethod = row.method.parse().map_err(decode)?;
            let tender = match method {
                PaymentMethod::Points => {
                    let required = row
                        .required_points
                        .ok_or(CsvError::MissingRequiredPoints { line })?;
                    Tender::Points(required)
                }
                PaymentMethod::Cash | PaymentMethod::Wallet => {
                    let amount = row
                        .amount
                        .ok_or(CsvError::MissingAmount { line, method })?;
                    let gross = Amount::from_float(amount);
                    if method == PaymentMethod::Cash {
                        Tender::Cash(gross)
                    } else {
                        Tender::Wallet(gross)
                    }
                }
            };

            let mut request = PurchaseRequest::new(member_ref(row.member), row.pin, tender);
            if let Some(channel) = row.channel.filter(|c| !c.is_empty()) {
                let channel: Channel = channel.parse().map_err(decode)?;
                request = request.with_channel(channel);
            }
            if let Some(points) = row.points_override {
                request = request.with_points_override(points);
            }
            if let Some(key) = row.key.filter(|k| !k.is_empty()) {
                request = request.with_idempotency_key(key);
            }
            if let Some(product) = row.product.filter(|p| !p.is_empty()) {
                request = request.with_product(product);
            }
            Ok(request)
        }))
}

/// Write member balances in csv format
pub fn write_members<'a>(
    writer: impl io::Write,
    members: impl IntoIterator<Item = &'a Member>,
) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(writer);

    for member in members {
        let row = MemberOutputRow {
            membership_no: &member.membership_no,
            tier: member.tier.to_string(),
            points: member.points,
            wallet: member.wallet.to_string(),
            spend: member.rolling_spend.to_string(),
        };
        writer.serialize(&row).map_err(CsvError::Write)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write settled transactions in csv format
pub fn write_journal<'a>(
    writer: impl io::Write,
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(writer);

    for tx in transactions {
        let row = JournalRow {
            id: tx.id,
            member: &tx.member,
            club: tx.club.as_deref(),
            method: tx.method.to_string(),
            channel: tx.channel.to_string(),
            gross: tx.gross.to_string(),
            net: tx.net.to_string(),
            fee: tx.fee.to_string(),
            points_earned: tx.points_earned,
            points_spent: tx.points_spent,
            brand_applied: tx.brand_applied.as_deref(),
            reward_eligible: tx.reward_eligible,
            timestamp: tx.timestamp,
        };
        writer.serialize(&row).map_err(CsvError::Write)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MEMBER_HEADER: &str =
        "membership_no,phone,pin,tier,points,wallet,spend,vip_booking,club_home\n";
    const PURCHASE_HEADER: &str =
        "member,pin,method,amount,required_points,points_override,channel,key\n";

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn read_all_members(rows: &str) -> Vec<Result<Member, CsvError>> {
        let file = write_csv(&format!("{MEMBER_HEADER}{rows}"));
        read_members(file.path()).unwrap().collect()
    }

    fn read_all_purchases(rows: &str) -> Vec<Result<PurchaseRequest, CsvError>> {
        read_purchases_with_header(PURCHASE_HEADER, rows)
    }

    fn read_purchases_with_header(
        header: &str,
        rows: &str,
    ) -> Vec<Result<PurchaseRequest, CsvError>> {
        let file = write_csv(&format!("{header}{rows}"));
        read_purchases(file.path()).unwrap().collect()
    }

    fn first_purchase(rows: &str) -> PurchaseRequest {
        read_all_purchases(rows).into_iter().next().unwrap().unwrap()
    }

    #[test]
    fn read_member() {
        let results = read_all_members(
            "TGVIG100001,0810000001,1001,Silver,1200,600.5,8000,true,717 Hangout\n",
        );
        assert_eq!(results.len(), 1);

        let member = results.into_iter().next().unwrap().unwrap();
        assert_eq!(member.membership_no, "TGVIG100001");
        assert_eq!(member.phone, "0810000001");
        assert_eq!(member.tier, Tier::Silver);
        assert_eq!(member.points, 1_200);
        assert_eq!(member.wallet, Amount::from_float(600.5));
        assert_eq!(member.rolling_spend, Amount::from_whole(8_000));
        assert!(member.vip_booking);
        assert_eq!(member.club_home.as_deref(), Some("717 Hangout"));
        assert!(member.pin.verify("1001"));
    }

    #[test]
    fn read_member_with_empty_optionals() {
        let results = read_all_members("TGVIG100002, 0810000002, 1002, gold, 0, 0, 0, ,\n");
        let member = results.into_iter().next().unwrap().unwrap();
        assert!(!member.vip_booking);
        assert_eq!(member.club_home, None);
    }

    #[test]
    fn unknown_tier_is_a_decode_error() {
        let results = read_all_members("TGVIG100001,0810000001,1001,Platinum,0,0,0,,\n");
        assert!(matches!(
            results[0].as_ref().unwrap_err(),
            CsvError::Decode {
                line: 2,
                source: ParseError::UnknownTier(_)
            }
        ));
    }

    #[test]
    fn negative_balances_are_rejected() {
        let results = read_all_members(
            "M1,081,1,Gold,0,-50,-10,,\nM2,082,2,Gold,0,10,-0.5,,\nM3,083,3,Gold,0,0,0,,\n",
        );
        assert!(matches!(
            results[0].as_ref().unwrap_err(),
            CsvError::NegativeBalance {
                line: 2,
                field: "wallet"
            }
        ));
        assert!(matches!(
            results[1].as_ref().unwrap_err(),
            CsvError::NegativeBalance {
                line: 3,
                field: "spend"
            }
        ));
        assert!(results[2].is_ok());
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let result = read_members("/nonexistent/members.csv");
        assert!(matches!(result, Err(CsvError::Open { .. })));
    }

    #[test]
    fn read_cash_purchase_by_membership_no() {
        let request = first_purchase("TGVIG100001,1001,CASH,50.0,,,,\n");
        assert_eq!(
            request.member,
            MemberRef::MembershipNo("TGVIG100001".to_string())
        );
        assert_eq!(request.tender, Tender::Cash(Amount::from_whole(50)));
        assert_eq!(request.channel, Channel::Pos);
        assert_eq!(request.points_override, None);
        assert_eq!(request.idempotency_key, None);
        assert_eq!(request.product, None);
    }

    #[test]
    fn read_wallet_purchase_by_phone_with_options() {
        let request = first_purchase("0810000001,1001,wallet,12.25,,20,app,till-1\n");
        assert_eq!(request.member, MemberRef::Phone("0810000001".to_string()));
        assert_eq!(request.tender, Tender::Wallet(Amount::from_float(12.25)));
        assert_eq!(request.channel, Channel::App);
        assert_eq!(request.points_override, Some(20));
        assert_eq!(request.idempotency_key.as_deref(), Some("till-1"));
    }

    #[test]
    fn read_purchase_with_product_column() {
        let header =
            "member,pin,method,amount,required_points,points_override,channel,key,product\n";
        let results = read_purchases_with_header(
            header,
            "TGVIG100001,1001,CASH,50.0,,,,,Wine\nTGVIG100001,1001,CASH,50.0,,,,,\n",
        );
        let tagged = results[0].as_ref().unwrap();
        assert_eq!(tagged.product.as_deref(), Some("Wine"));
        assert_eq!(results[1].as_ref().unwrap().product, None);
    }

    #[test]
    fn read_points_purchase() {
        let request = first_purchase("TGVIG100001,1001,POINTS,,60,,,\n");
        assert_eq!(request.tender, Tender::Points(60));
    }

    #[test]
    fn read_returns_error_for_missing_amount() {
        let results = read_all_purchases("TGVIG100001,1001,CASH,,,,,\n");
        assert!(matches!(
            results[0].as_ref().unwrap_err(),
            CsvError::MissingAmount {
                line: 2,
                method: PaymentMethod::Cash
            }
        ));
    }

    #[test]
    fn read_returns_error_for_missing_required_points() {
        let results = read_all_purchases("TGVIG100001,1001,POINTS,10.0,,,,\n");
        assert!(matches!(
            results[0].as_ref().unwrap_err(),
            CsvError::MissingRequiredPoints { line: 2 }
        ));
    }

    #[test]
    fn read_returns_error_for_unknown_method_and_channel() {
        let results = read_all_purchases(
            "TGVIG100001,1001,CARD,10.0,,,,\nTGVIG100001,1001,CASH,10.0,,,kiosk,\n",
        );
        assert!(matches!(
            results[0].as_ref().unwrap_err(),
            CsvError::Decode {
                line: 2,
                source: ParseError::UnknownPaymentMethod(_)
            }
        ));
        assert!(matches!(
            results[1].as_ref().unwrap_err(),
            CsvError::Decode {
                line: 3,
                source: ParseError::UnknownChannel(_)
            }
        ));
    }

    #[test]
    fn bad_row_does_not_stop_reading() {
        let results = read_all_purchases(
            "TGVIG100001,1001,CASH,abc,,,,\nTGVIG100001,1001,CASH,5.0,,,,\n",
        );
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(CsvError::Parse { line: 2, .. })));
        assert!(results[1].is_ok());
    }

    #[test]
    fn write_member_rows() {
        let member = Member::new("TGVIG100001", "0810000001", "1001")
            .unwrap()
            .with_points(103)
            .with_wallet(Amount::from_whole(53))
            .with_rolling_spend(Amount::from_float(50.5));
        let mut out = Vec::new();
        write_members(&mut out, [&member]).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "membership_no,tier,points,wallet,spend\nTGVIG100001,Gold,103,53.0000,50.5000\n"
        );
    }

    #[test]
    fn write_journal_rows() {
        let tx = Transaction {
            id: Uuid::nil(),
            member: "TGVIG100001".to_string(),
            club: None,
            method: PaymentMethod::Wallet,
            channel: Channel::App,
            gross: Amount::from_whole(50),
            net: Amount::from_whole(45),
            fee: Amount::from_float(1.5),
            points_earned: 6,
            points_spent: 0,
            brand_applied: Some("Vodka Royale".to_string()),
            reward_eligible: true,
            timestamp: Utc::now(),
        };
        let mut out = Vec::new();
        write_journal(&mut out, [&tx]).unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(
                "id,member,club,method,channel,gross,net,fee,points_earned,points_spent,\
                 brand_applied,reward_eligible,timestamp"
            )
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with(
            "00000000-0000-0000-0000-000000000000,TGVIG100001,,WALLET,APP,\
             50.0000,45.0000,1.5000,6,0,Vodka Royale,true,"
        ));
    }
}
