use napi::Result as NapiResult;
use napi_derive::napi;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Accrual
// ---------------------------------------------------------------------------

#[napi]
pub fn assess_accrual(input_json: String) -> NapiResult<String> {
    let input: tranche_pool_core::accrual::AccrualInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = tranche_pool_core::accrual::assess_owed(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compute_writedown(input_json: String) -> NapiResult<String> {
    let input: tranche_pool_core::accrual::WritedownInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = tranche_pool_core::accrual::run_writedown(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn allocate_payment(input_json: String) -> NapiResult<String> {
    let input: tranche_pool_core::accrual::PaymentAllocationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        tranche_pool_core::accrual::run_payment_allocation(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Leverage
// ---------------------------------------------------------------------------

#[napi]
pub fn estimate_investment(input_json: String) -> NapiResult<String> {
    let input: tranche_pool_core::leverage::InvestmentEstimateInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        tranche_pool_core::leverage::run_investment_estimate(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
