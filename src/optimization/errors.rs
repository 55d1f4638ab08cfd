use argmin::core::{ArgminError, Error};

use crate::{optimization::bestfit::outcome::OptimOutcome, quanta::errors::QuantaError};

/// Crate-wide result alias for objective and optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Gradient ----
    /// Gradient dimensions do not match the number of varied parameters.
    GradientDimMismatch {
        expected: usize,
        found: usize,
    },

    /// Gradient elements need to be finite
    InvalidGradient {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    // ---- Options ----
    /// Gradient tolerance needs to be positive and finite.
    InvalidTolGrad {
        tol: f64,
        reason: &'static str,
    },
    /// Cost change tolerance needs to be positive and finite.
    InvalidTolCost {
        tol: f64,
        reason: &'static str,
    },
    /// Log-likelihood-ratio tolerance needs to be positive and finite.
    InvalidLlrTolerance {
        tol: f64,
        reason: &'static str,
    },
    /// Maximum iterations needs to be positive.
    InvalidMaxIter {
        max_iter: usize,
        reason: &'static str,
    },
    /// At least one tolerance must be provided.
    NoTolerancesProvided,

    /// Invalid line searcher name.
    InvalidLineSearch {
        name: String,
        reason: &'static str,
    },

    /// lbfgs_mem needs to be at least 1.
    InvalidLBFGSMem {
        mem: usize,
        reason: &'static str,
    },

    /// NaN replacement value must itself be a number.
    InvalidNanValue {
        value: f64,
    },

    /// Initial step sizes must be finite and strictly positive.
    InvalidStepSize {
        name: String,
        value: f64,
    },

    /// The error definition (`up`) must be finite and strictly positive.
    InvalidErrordef {
        value: f64,
    },

    /// Bound interval must satisfy `lower < upper` and contain no NaN.
    InvalidBound {
        name: String,
        lower: f64,
        upper: f64,
    },

    // ---- Interval objective ----
    /// Critical quantile must lie strictly inside (0, 1).
    InvalidQuantile {
        value: f64,
    },
    /// A custom critical-value function and its derivative must come together.
    InvalidCriticalValue {
        reason: &'static str,
    },

    // ---- Parameter sets ----
    /// Parameter name is not known to the likelihood.
    UnknownParameter {
        name: String,
    },
    /// Parameter name appears twice (e.g. both varied and fixed).
    DuplicateParameter {
        name: String,
    },
    /// Likelihood parameter is neither varied nor fixed.
    MissingParameter {
        name: String,
    },
    /// Parameter vector length does not match the list of names.
    ParamLengthMismatch {
        expected: usize,
        found: usize,
    },

    // ---- Objective boundary ----
    /// Memoization keys on plain numbers; native inputs cannot be cached.
    MemoizedNativeInput,

    // ---- Cost function ----
    /// Cost function returned a non-finite value.
    NonFiniteCost {
        value: f64,
    },

    // ---- Optimizer outcome ----
    /// Estimated parameters must be finite.
    InvalidThetaHat {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    /// Theta hat is missing
    MissingThetaHat,

    /// The optimizer stopped without converging.
    OptimizerFailure {
        outcome: Box<OptimOutcome>,
    },

    // ---- Argmin ---
    /// Wrapper for argmin::InvalidParameter
    InvalidParameter {
        text: String,
    },
    /// Wrapper for argmin::NotImplemented
    NotImplemented {
        text: String,
    },
    /// Wrapper for argmin::NotInitialized
    NotInitialized {
        text: String,
    },
    /// Wrapper for argmin::ConditionViolated
    ConditionViolated {
        text: String,
    },
    /// Wrapper for argmin::CheckPointNotFound
    CheckPointNotFound {
        text: String,
    },
    /// Wrapper for argmin::PotentialBug
    PotentialBug {
        text: String,
    },
    /// Wrapper for argmin::ImpossibleError
    ImpossibleError {
        text: String,
    },
    /// Wrapper for other argmin::Error types
    BackendError {
        text: String,
    },

    // ---- Finite Diffs ----
    /// Hessian matrix dimensions do not match parameter dimensions.
    HessianDimMismatch {
        expected: usize,
        found: (usize, usize),
    },

    /// Hessian values need to be finite.
    InvalidHessian {
        row: usize,
        col: usize,
        value: f64,
    },

    /// Hessian could not be inverted.
    SingularHessian,

    // ---- Quanta block ----
    /// Failure raised by the quanta-splitting block inside a likelihood.
    Quanta(QuantaError),

    // ---- Fallback ----
    UnknownError,
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Gradient ----
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient dimension mismatch: expected {expected}, found {found}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Invalid gradient at index {index}: {value}: {reason}")
            }

            // ---- Options ----
            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "Invalid gradient tolerance {tol}: {reason}")
            }
            OptError::InvalidTolCost { tol, reason } => {
                write!(f, "Invalid cost function change tolerance {tol}: {reason}")
            }
            OptError::InvalidLlrTolerance { tol, reason } => {
                write!(f, "Invalid log-likelihood-ratio tolerance {tol}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::NoTolerancesProvided => {
                write!(f, "No tolerances provided")
            }
            OptError::InvalidLineSearch { name, reason } => {
                write!(f, "Invalid line searcher '{name}': {reason}")
            }
            OptError::InvalidLBFGSMem { mem, reason } => {
                write!(f, "Invalid L-BFGS memory {mem}: {reason}")
            }
            OptError::InvalidNanValue { value } => {
                write!(f, "Invalid NaN replacement value {value}: must not be NaN")
            }
            OptError::InvalidStepSize { name, value } => {
                write!(f, "Invalid initial step for '{name}': {value}, must be finite and > 0")
            }
            OptError::InvalidErrordef { value } => {
                write!(f, "Invalid error definition {value}: must be finite and > 0")
            }
            OptError::InvalidBound { name, lower, upper } => {
                write!(f, "Invalid bound for '{name}': ({lower}, {upper})")
            }

            // ---- Interval objective ----
            OptError::InvalidQuantile { value } => {
                write!(f, "Invalid critical quantile {value}: must lie in (0, 1)")
            }
            OptError::InvalidCriticalValue { reason } => {
                write!(f, "Invalid critical-value configuration: {reason}")
            }

            // ---- Parameter sets ----
            OptError::UnknownParameter { name } => {
                write!(f, "Unknown parameter '{name}'")
            }
            OptError::DuplicateParameter { name } => {
                write!(f, "Parameter '{name}' given more than once")
            }
            OptError::MissingParameter { name } => {
                write!(f, "Parameter '{name}' is neither varied nor fixed")
            }
            OptError::ParamLengthMismatch { expected, found } => {
                write!(f, "Parameter length mismatch: expected {expected}, found {found}")
            }

            // ---- Objective boundary ----
            OptError::MemoizedNativeInput => {
                write!(f, "Memoization requires plain numeric input, got a native vector")
            }

            // ---- Cost function ----
            OptError::NonFiniteCost { value } => {
                write!(f, "Non-finite cost value: {value}")
            }

            // ---- Optimizer outcome ----
            OptError::InvalidThetaHat { index, value, reason } => {
                write!(f, "Invalid estimated parameter at index {index}: {value}: {reason}")
            }
            OptError::MissingThetaHat => {
                write!(f, "Missing estimated parameters (theta hat)")
            }
            OptError::OptimizerFailure { outcome } => {
                write!(
                    f,
                    "Optimizer failure after {} iterations: {}",
                    outcome.iterations, outcome.status
                )
            }

            // ---- Argmin ----
            OptError::InvalidParameter { text } => {
                write!(f, "Invalid parameter: {text}")
            }
            OptError::NotImplemented { text } => {
                write!(f, "Not implemented: {text}")
            }
            OptError::NotInitialized { text } => {
                write!(f, "Not initialized: {text}")
            }
            OptError::ConditionViolated { text } => {
                write!(f, "Condition violated: {text}")
            }
            OptError::CheckPointNotFound { text } => {
                write!(f, "Checkpoint not found: {text}")
            }
            OptError::PotentialBug { text } => {
                write!(f, "Potential bug: {text}")
            }
            OptError::ImpossibleError { text } => {
                write!(f, "Impossible error: {text}")
            }
            OptError::BackendError { text } => {
                write!(f, "Backend error: {text}")
            }

            // ---- Finite Diffs ----
            OptError::HessianDimMismatch { expected, found } => {
                write!(
                    f,
                    "Hessian dimension mismatch: expected ({expected}, {expected}), found {found:?}"
                )
            }
            OptError::InvalidHessian { row, col, value } => {
                write!(f, "Invalid Hessian at ({row}, {col}): {value}, must be finite")
            }
            OptError::SingularHessian => {
                write!(f, "Hessian is singular and cannot be inverted")
            }

            // ---- Quanta block ----
            OptError::Quanta(err) => {
                write!(f, "Quanta block error: {err}")
            }

            // ---- Fallback ----
            OptError::UnknownError => {
                write!(f, "Unknown error")
            }
        }
    }
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        // Errors raised by our own objective travel through argmin boxed.
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(argmin_err) => match argmin_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => OptError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => OptError::ImpossibleError { text },
                _ => OptError::UnknownError,
            },
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}

impl From<QuantaError> for OptError {
    fn from(err: QuantaError) -> Self {
        OptError::Quanta(err)
    }
}
