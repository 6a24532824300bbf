pub mod amortization;

pub use amortization::{
    amortize, build_loan_schedule, first_year_interest, LoanInput, LoanPayment,
    LoanScheduleOutput, RepaymentScheme,
};
