//! Solidity ABI surface of the relay, the pool and their collaborators.
//!
//! Both the contracts (decoding calldata, encoding reverts) and the off-chain client
//! (encoding calldata, signing requests) use these exact types, so the selectors and
//! layouts cannot drift apart.

use alloy_sol_types::sol;

sol! {
    #![sol(all_derives)]

    /// Meta-transaction request signed off-chain by `from`.
    ///
    /// Field order is part of the EIP-712 type string and must not change.
    struct Request {
        address from;
        address target;
        uint256 value;
        uint256 gas;
        uint256 nonce;
        bytes data;
        uint256 deadline;
    }

    interface IForwarder {
        error InvalidSignature();
        error Expired(uint256 deadline, uint256 timestamp);
        error NonceMismatch(uint256 expected, uint256 provided);
        error InvalidTarget(address target);
        error InvalidValue(uint256 expected, uint256 provided);

        function execute(Request request, bytes signature) external payable returns (bool success);
        function nonces(address signer) external view returns (uint256);
        function domainSeparator() external view returns (bytes32);
    }

    interface ITrustedForwarderAware {
        function trustedForwarder() external view returns (address);
    }

    interface IPool {
        error LoanNotRepaid(address borrower, uint256 principal, uint256 fee);
        error InsufficientBalance(uint256 requested, uint256 available);
        error Unauthorized(address caller);
        error UnsupportedCurrency(address token);
        error CallbackFailed(address receiver);

        function flashLoan(address receiver, address token, uint256 amount, bytes data) external returns (bool);
        function flashFee(address token, uint256 amount) external view returns (uint256);
        function maxFlashLoan(address token) external view returns (uint256);
        function multicall(bytes[] data) external returns (bytes[] results);
        function withdraw(uint256 amount, address receiver) external;
        function deposit() external payable;
        function totalDeposits() external view returns (uint256);
        function feeReceiver() external view returns (address);
        function trustedForwarder() external view returns (address);
        function asset() external view returns (address);
        function ledger() external view returns (uint256 totalBalance, address feeReceiver, uint256 feePerLoan, uint256 maxLoanAmount);
    }

    interface IFlashBorrower {
        error UntrustedLender(address lender);
        error UnsupportedCurrency(address token);

        function onFlashLoan(address initiator, address token, uint256 amount, uint256 fee, bytes data) external returns (bytes32);
    }

    interface IWrappedAsset {
        error InsufficientBalance(address owner, uint256 balance, uint256 needed);
        error InsufficientAllowance(address owner, address spender, uint256 allowance, uint256 needed);

        function deposit() external payable;
        function withdraw(uint256 amount) external;
        function transfer(address to, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function totalSupply() external view returns (uint256);
    }
}
